//! MCP Streamable HTTP service creation
//!
//! Builds the rmcp service that the HTTP transport nests into its Axum
//! router.

use std::sync::Arc;

use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::session::{SessionLifecycle, TransportKind};

use super::server::TaskMasterServer;

/// Create the MCP Streamable HTTP service.
///
/// Every HTTP session gets its own [`TaskMasterServer`], so session state
/// never crosses connections. All sessions share `lifecycle` and through it
/// the provider registry.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use axum::Router;
/// use tokio_util::sync::CancellationToken;
/// use taskmaster_mcp::config::ServerConfig;
/// use taskmaster_mcp::mcp::create_mcp_service;
/// use taskmaster_mcp::providers::ProviderRegistry;
/// use taskmaster_mcp::session::SessionLifecycle;
///
/// let lifecycle = Arc::new(SessionLifecycle::new(ProviderRegistry::global()));
/// let service = create_mcp_service(
///     Arc::new(ServerConfig::default()),
///     lifecycle,
///     CancellationToken::new(),
/// );
/// let app: Router = Router::new().nest_service("/mcp", service);
/// ```
pub fn create_mcp_service(
    config: Arc<ServerConfig>,
    lifecycle: Arc<SessionLifecycle>,
    cancellation_token: CancellationToken,
) -> StreamableHttpService<TaskMasterServer, LocalSessionManager> {
    // Returns io::Error to match rmcp's expected factory signature
    let service_factory = move || -> Result<TaskMasterServer, std::io::Error> {
        Ok(TaskMasterServer::new(
            Arc::clone(&config),
            Arc::clone(&lifecycle),
            TransportKind::Http,
        ))
    };

    let mut http_config = StreamableHttpServerConfig::default();
    http_config.stateful_mode = true;
    http_config.cancellation_token = cancellation_token;

    StreamableHttpService::new(
        service_factory,
        LocalSessionManager::default().into(),
        http_config,
    )
}
