//! Server bootstrap: transport selection, startup and graceful shutdown.

mod error;


use std::sync::Arc;

use axum::Router;
use rmcp::{ServiceExt, transport::io::stdio};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{DEFAULT_ENDPOINT, ServerConfig, TransportSettings};
use crate::mcp::{TaskMasterServer, create_mcp_service};
use crate::providers::ProviderRegistry;
use crate::session::{SessionLifecycle, TransportKind};

pub use error::{ServerError, ServerResult};

/// The transport chosen from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http {
        host: String,
        port: u16,
        endpoint: String,
    },
}

impl Transport {
    /// Networked transport needs host, port and the explicit enable flag;
    /// anything less falls back to stdio.
    pub fn from_settings(settings: &TransportSettings) -> Self {
        match (&settings.host, settings.port, settings.http_enabled) {
            (Some(host), Some(port), true) => Self::Http {
                host: host.clone(),
                port,
                endpoint: normalize_endpoint(&settings.endpoint),
            },
            _ => Self::Stdio,
        }
    }
}

/// Ensure exactly one leading `/`. Blank input yields the default endpoint.
pub fn normalize_endpoint(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_ENDPOINT.to_string();
    }
    format!("/{}", raw.trim_start_matches('/'))
}

/// Initialize tracing with env filter.
///
/// Logs go to stderr: stdout carries the stdio protocol stream.
pub fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "taskmaster_mcp=info",
        1 => "taskmaster_mcp=debug,rmcp=info,tower_http=info",
        _ => "taskmaster_mcp=trace,rmcp=debug,tower_http=debug",
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the server until a shutdown signal arrives.
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    init_tracing(config.verbosity);

    let transport = Transport::from_settings(&config.transport);
    let config = Arc::new(config);
    let lifecycle = Arc::new(SessionLifecycle::new(ProviderRegistry::global()));

    // Held until shutdown; cancelling it stops the transport.
    let keep_alive = CancellationToken::new();
    tokio::spawn(cancel_on_signal(keep_alive.clone()));

    match transport {
        Transport::Stdio => run_stdio(config, lifecycle, keep_alive).await,
        Transport::Http {
            host,
            port,
            endpoint,
        } => {
            let listener = bind(&host, port, &endpoint).await?;
            serve_http(listener, config, lifecycle, &endpoint, keep_alive).await
        }
    }
}

/// Serve a single session over stdin/stdout.
pub async fn run_stdio(
    config: Arc<ServerConfig>,
    lifecycle: Arc<SessionLifecycle>,
    keep_alive: CancellationToken,
) -> ServerResult<()> {
    info!(transport = "stdio", "Starting MCP server");

    let server = TaskMasterServer::new(config, lifecycle, TransportKind::Stdio);
    let service = server
        .serve_with_ct(stdio(), keep_alive)
        .await
        .map_err(|e| ServerError::Stdio {
            message: e.to_string(),
        })?;

    let reason = service.waiting().await.map_err(|e| ServerError::Stdio {
        message: e.to_string(),
    })?;

    info!(transport = "stdio", reason = ?reason, "MCP server stopped");
    Ok(())
}

/// Bind the HTTP listener. Failures are logged with the full address.
pub async fn bind(host: &str, port: u16, endpoint: &str) -> ServerResult<TcpListener> {
    TcpListener::bind((host, port)).await.map_err(|source| {
        error!(
            host,
            port,
            endpoint,
            error = %source,
            "Failed to start MCP HTTP transport"
        );
        ServerError::Bind {
            host: host.to_string(),
            port,
            endpoint: endpoint.to_string(),
            source,
        }
    })
}

/// Build the HTTP router with the MCP service mounted at `endpoint`.
pub fn router(
    config: Arc<ServerConfig>,
    lifecycle: Arc<SessionLifecycle>,
    endpoint: &str,
    keep_alive: CancellationToken,
) -> Router {
    let service = create_mcp_service(config, lifecycle, keep_alive);

    let router = if endpoint == "/" {
        Router::new().fallback_service(service)
    } else {
        Router::new().nest_service(endpoint, service)
    };
    router.layer(TraceLayer::new_for_http())
}

/// Serve HTTP on `listener` until `keep_alive` is cancelled.
pub async fn serve_http(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    lifecycle: Arc<SessionLifecycle>,
    endpoint: &str,
    keep_alive: CancellationToken,
) -> ServerResult<()> {
    let app = router(config, lifecycle, endpoint, keep_alive.clone());

    match listener.local_addr() {
        Ok(addr) => info!(transport = "http", "MCP server listening on http://{}{}", addr, endpoint),
        Err(err) => warn!(error = %err, "Listening address unavailable"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { keep_alive.cancelled().await })
        .await
        .map_err(|source| ServerError::Serve { source })?;

    info!(transport = "http", "MCP server stopped");
    Ok(())
}

async fn cancel_on_signal(keep_alive: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = keep_alive.cancelled() => return,
    }

    info!("Shutdown signal received");
    keep_alive.cancel();
}
