//! Command-line and environment surface of the server binary.

use std::path::PathBuf;

use clap::Parser;
use clap::builder::BoolishValueParser;

use crate::config::{DEFAULT_ENDPOINT, ServerConfig, StorageConfig, TransportSettings};

#[derive(Parser, Debug)]
#[command(name = "task-master-mcp")]
#[command(author, version, about = "Multi-tenant Task Master MCP server", long_about = None)]
pub struct Cli {
    /// Host address for the HTTP transport
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port for the HTTP transport
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path the MCP endpoint is mounted at
    #[arg(long, env = "MCP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Serve over HTTP instead of stdio (requires host and port)
    #[arg(
        long,
        env = "MCP_HTTP_ENABLED",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        default_value_t = false,
        default_missing_value = "true",
        num_args = 0..=1
    )]
    pub http: bool,

    /// Root for per-user storage namespaces
    #[arg(long, env = "STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    /// Flat storage root used when no user identity is present
    #[arg(long, env = "TASK_MASTER_STORAGE_ROOT")]
    pub flat_storage_root: Option<PathBuf>,

    /// Project root used when a tool call does not name one
    #[arg(long, env = "TASK_MASTER_PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolve the parsed arguments into the configuration threaded through
    /// the server. Blank storage roots count as unset.
    pub fn into_config(self) -> ServerConfig {
        let mut storage = StorageConfig::default();
        if let Some(root) = self.storage_root.filter(|p| !p.as_os_str().is_empty()) {
            storage = storage.with_user_root(root);
        }
        if let Some(root) = self.flat_storage_root.filter(|p| !p.as_os_str().is_empty()) {
            storage = storage.with_flat_root(root);
        }

        let transport = TransportSettings {
            host: self.host,
            port: self.port,
            endpoint: self.endpoint,
            http_enabled: self.http,
        };

        ServerConfig::default()
            .with_transport(transport)
            .with_storage(storage)
            .with_project_root(self.project_root)
            .with_verbosity(self.verbose)
    }
}
