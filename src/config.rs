//! Server configuration.
//!
//! Settings are resolved once, at startup, by [`crate::cli::Cli`] into a
//! [`ServerConfig`] that is handed to each component. Nothing downstream reads
//! the process environment while serving requests.

use std::path::PathBuf;

/// Per-user storage root used when `STORAGE_ROOT` is not set.
pub const DEFAULT_USER_STORAGE_ROOT: &str = "/app/storage";

/// Endpoint used when `MCP_ENDPOINT` is not set.
pub const DEFAULT_ENDPOINT: &str = "/mcp";

/// Storage roots consulted by the path resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root under which per-user namespaces are created (`STORAGE_ROOT`).
    pub user_root: PathBuf,
    /// Flat override used verbatim when no identity is bound
    /// (`TASK_MASTER_STORAGE_ROOT`).
    pub flat_root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            user_root: PathBuf::from(DEFAULT_USER_STORAGE_ROOT),
            flat_root: None,
        }
    }
}

impl StorageConfig {
    pub fn with_user_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.user_root = root.into();
        self
    }

    pub fn with_flat_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.flat_root = Some(root.into());
        self
    }
}

/// Raw transport settings as configured. See [`crate::server::Transport`] for
/// the resolved choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub endpoint: String,
    /// Explicit opt-in for the networked transport (`MCP_HTTP_ENABLED`).
    pub http_enabled: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http_enabled: false,
        }
    }
}

impl TransportSettings {
    pub fn with_http(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self.http_enabled = true;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Top-level configuration threaded through the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub transport: TransportSettings,
    pub storage: StorageConfig,
    /// Project root used when a tool call does not name one.
    pub project_root: PathBuf,
    /// Number of `-v` flags; selects the default log filter.
    pub verbosity: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportSettings::default(),
            storage: StorageConfig::default(),
            project_root: PathBuf::from("."),
            verbosity: 0,
        }
    }
}

impl ServerConfig {
    pub fn with_transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}
