//! Provider backed by the client's MCP sampling capability.

use async_trait::async_trait;
use rmcp::model::{CreateMessageRequestParams, CreateMessageResult};
use rmcp::{Peer, RoleServer};

use super::{Provider, ProviderError};

/// Registry slot for the sampling provider.
pub const MCP_PROVIDER: &str = "mcp";

/// Routes AI generation requests back to a connected client through
/// `sampling/createMessage`.
#[derive(Clone)]
pub struct McpSamplingProvider {
    session_id: String,
    peer: Peer<RoleServer>,
}

impl McpSamplingProvider {
    pub fn new(session_id: impl Into<String>, peer: Peer<RoleServer>) -> Self {
        Self {
            session_id: session_id.into(),
            peer,
        }
    }
}

#[async_trait]
impl Provider for McpSamplingProvider {
    fn session_id(&self) -> String {
        self.session_id.clone()
    }

    async fn create_message(
        &self,
        request: CreateMessageRequestParams,
    ) -> Result<CreateMessageResult, ProviderError> {
        #[allow(deprecated)]
        self.peer
            .create_message(request)
            .await
            .map_err(|e| ProviderError::Sampling {
                session_id: self.session_id.clone(),
                message: e.to_string(),
            })
    }
}
