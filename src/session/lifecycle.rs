//! Connect/disconnect handling for sessions.
//!
//! Each session goes through
//! `Connected -> IdentityBound -> {ProviderRegistered | ProviderSkipped} -> Disconnected`,
//! one transition at a time and never retried. Failures are logged and
//! absorbed here so one session cannot take down another.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, info, warn};

use crate::providers::{MCP_PROVIDER, Provider, ProviderRegistry, RegistryError};

use super::{Session, SessionState, USER_ID_CONTEXT_KEY, authenticate};

/// Why provider registration did not happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Client did not advertise the capability the provider needs.
    MissingCapability(&'static str),
    /// `on_connect` already ran for this session.
    AlreadyConnected,
    /// Session disconnected while registration was in flight.
    SessionClosed,
}

/// Result of the provider-registration step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Registered,
    Skipped(SkipReason),
    Failed(RegistryError),
}

pub struct SessionLifecycle {
    registry: Arc<ProviderRegistry>,
}

impl SessionLifecycle {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Handle a new session.
    ///
    /// `headers` is the transport metadata (absent on stdio). `make_provider`
    /// is only called when the session supports sampling.
    pub fn on_connect<F>(
        &self,
        session: &Session,
        headers: Option<&HeaderMap>,
        make_provider: F,
    ) -> ProviderOutcome
    where
        F: FnOnce() -> Arc<dyn Provider>,
    {
        info!(
            session_id = %session.id(),
            transport = %session.transport(),
            sampling = session.capabilities().sampling,
            "Session connected"
        );

        if let Err(state) = session.advance(SessionState::IdentityBound) {
            warn!(session_id = %session.id(), state = ?state, "Connect handler already ran");
            return ProviderOutcome::Skipped(SkipReason::AlreadyConnected);
        }

        self.bind_identity(session, headers);
        self.register_provider(session, make_provider)
    }

    fn bind_identity(&self, session: &Session, headers: Option<&HeaderMap>) {
        match authenticate(headers) {
            Some(identity) => {
                session.set_context_value(USER_ID_CONTEXT_KEY, identity.as_str());
                info!(session_id = %session.id(), user_id = %identity, "Bound user identity");
            }
            None => {
                debug!(session_id = %session.id(), "No user identity; using shared storage");
            }
        }
    }

    fn register_provider<F>(&self, session: &Session, make_provider: F) -> ProviderOutcome
    where
        F: FnOnce() -> Arc<dyn Provider>,
    {
        if !session.capabilities().sampling {
            info!(
                session_id = %session.id(),
                provider = MCP_PROVIDER,
                "Client lacks sampling capability; provider not registered"
            );
            settle(session, SessionState::ProviderSkipped);
            return ProviderOutcome::Skipped(SkipReason::MissingCapability("sampling"));
        }

        if let Err(err) = self.registry.register_provider(MCP_PROVIDER, make_provider()) {
            warn!(
                session_id = %session.id(),
                provider = MCP_PROVIDER,
                error = %err,
                "Provider registration failed; continuing without provider"
            );
            settle(session, SessionState::ProviderSkipped);
            return ProviderOutcome::Failed(err);
        }

        if session.advance(SessionState::ProviderRegistered).is_err() {
            // Disconnect already ran: the provider must not outlive the session.
            if let Err(err) = self.registry.unregister_session(MCP_PROVIDER, session.id()) {
                warn!(
                    session_id = %session.id(),
                    provider = MCP_PROVIDER,
                    error = %err,
                    "Failed to release provider of closed session"
                );
            }
            debug!(session_id = %session.id(), "Session closed during registration");
            return ProviderOutcome::Skipped(SkipReason::SessionClosed);
        }

        info!(session_id = %session.id(), provider = MCP_PROVIDER, "Registered provider");
        ProviderOutcome::Registered
    }

    /// Handle a session going away. Idempotent.
    pub fn on_disconnect(&self, session: &Session) {
        if session.advance(SessionState::Disconnected).is_err() {
            return;
        }

        match self.registry.unregister_session(MCP_PROVIDER, session.id()) {
            Ok(true) => debug!(session_id = %session.id(), provider = MCP_PROVIDER, "Released provider"),
            Ok(false) => {}
            Err(err) => warn!(session_id = %session.id(), error = %err, "Failed to release provider"),
        }
        info!(session_id = %session.id(), "Session disconnected");
    }
}

/// Record the end of the provider step; a session that already disconnected
/// stays disconnected.
fn settle(session: &Session, next: SessionState) {
    if let Err(state) = session.advance(next) {
        debug!(session_id = %session.id(), state = ?state, "Session left before provider step");
    }
}
