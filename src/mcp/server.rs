//! MCP server handler.
//!
//! One `TaskMasterServer` exists per connection: the HTTP transport builds a
//! fresh instance for every session and stdio serves exactly one. The
//! `initialize` request is treated as the connect event; dropping the last
//! handle to the handler is the disconnect event.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use axum::http::request::Parts;
use rmcp::{
    ErrorData as McpError, Peer, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars,
    schemars::JsonSchema,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::providers::McpSamplingProvider;
use crate::session::{ClientCapabilitySet, Session, SessionLifecycle, TransportKind};
use crate::storage::StorageNamespace;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoragePathsParams {
    #[schemars(
        description = "Project root to resolve against. Defaults to the server's configured project root."
    )]
    pub project_root: Option<String>,
}

/// Runs the disconnect step when the session's handler goes away.
struct SessionGuard {
    session: Arc<Session>,
    lifecycle: Arc<SessionLifecycle>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.lifecycle.on_disconnect(&self.session);
    }
}

#[derive(Clone)]
pub struct TaskMasterServer {
    config: Arc<ServerConfig>,
    lifecycle: Arc<SessionLifecycle>,
    transport: TransportKind,
    session: Arc<OnceLock<SessionGuard>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TaskMasterServer {
    pub fn new(
        config: Arc<ServerConfig>,
        lifecycle: Arc<SessionLifecycle>,
        transport: TransportKind,
    ) -> Self {
        Self {
            config,
            lifecycle,
            transport,
            session: Arc::new(OnceLock::new()),
            tool_router: Self::tool_router(),
        }
    }

    /// The session bound by `initialize`, if it has run.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.get().map(|guard| Arc::clone(&guard.session))
    }

    /// Resolve the storage namespace for the current session.
    ///
    /// Before `initialize` there is no identity, so the shared namespace is
    /// returned.
    pub fn storage_namespace(&self, project_root: Option<&str>) -> StorageNamespace {
        let project_root = project_root
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.project_root.clone());

        match self.session.get() {
            Some(guard) => guard
                .session
                .storage_namespace(&self.config.storage, &project_root),
            None => StorageNamespace::resolve(&self.config.storage, None, &project_root),
        }
    }

    /// Bind a new session. Returns false if this handler already has one.
    ///
    /// The session is created and connected inside the `OnceLock`
    /// initialiser, so concurrent `initialize` calls bind exactly one.
    pub(crate) fn connect(
        &self,
        capabilities: ClientCapabilitySet,
        parts: Option<&Parts>,
        peer: Peer<RoleServer>,
    ) -> bool {
        let mut created = false;
        self.session.get_or_init(|| {
            created = true;
            let session = Arc::new(Session::new(
                Uuid::new_v4().to_string(),
                self.transport,
                capabilities,
            ));
            let session_id = session.id().to_string();
            self.lifecycle
                .on_connect(&session, parts.map(|p| &p.headers), move || {
                    Arc::new(McpSamplingProvider::new(session_id, peer))
                });
            SessionGuard {
                session,
                lifecycle: Arc::clone(&self.lifecycle),
            }
        });

        if !created {
            warn!(transport = %self.transport, "Ignoring repeated initialize");
        }
        created
    }

    #[tool(
        description = "Show where this session's tasks are stored: the task-master directory, tasks directory and tasks.json path, and whether storage is private to the connected user."
    )]
    pub async fn get_storage_paths(
        &self,
        params: Parameters<StoragePathsParams>,
    ) -> Result<CallToolResult, McpError> {
        let namespace = self.storage_namespace(params.0.project_root.as_deref());

        let response = json!({
            "base": namespace.base().display().to_string(),
            "tasks_dir": namespace.tasks_dir().display().to_string(),
            "tasks_file": namespace.tasks_file().display().to_string(),
            "isolated": namespace.is_isolated(),
        });

        let text = serde_json::to_string_pretty(&response)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for TaskMasterServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.instructions = Some(
            "Task Master MCP Server - per-user task storage for AI agents".to_string(),
        );
        info
    }

    async fn initialize(
        &self,
        request: ClientInfo,
        context: RequestContext<RoleServer>,
    ) -> Result<ServerInfo, McpError> {
        let capabilities = ClientCapabilitySet {
            sampling: request.capabilities.sampling.is_some(),
        };
        let parts = context.extensions.get::<Parts>();
        self.connect(capabilities, parts, context.peer.clone());
        Ok(self.get_info())
    }
}
