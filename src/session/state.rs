//! Per-connection session state.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use crate::config::StorageConfig;
use crate::storage::StorageNamespace;

use super::Identity;

/// Execution-context key under which a bound identity is stored.
pub const USER_ID_CONTEXT_KEY: &str = "LIBRECHAT_USER_ID";

/// Client capabilities relevant to provider registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilitySet {
    pub sampling: bool,
}

/// Transport the session arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Lifecycle states, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    IdentityBound,
    ProviderRegistered,
    ProviderSkipped,
    Disconnected,
}

impl SessionState {
    /// Edges of the lifecycle state machine. Any live state may disconnect.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connected, IdentityBound)
                | (IdentityBound, ProviderRegistered)
                | (IdentityBound, ProviderSkipped)
                | (Connected | IdentityBound | ProviderRegistered | ProviderSkipped, Disconnected)
        )
    }
}

/// One live client connection.
///
/// The execution context is private to this session; it is the only place a
/// resolved identity is stored.
#[derive(Debug)]
pub struct Session {
    id: String,
    transport: TransportKind,
    capabilities: ClientCapabilitySet,
    context: RwLock<HashMap<String, String>>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        transport: TransportKind,
        capabilities: ClientCapabilitySet,
    ) -> Self {
        Self {
            id: id.into(),
            transport,
            capabilities,
            context: RwLock::new(HashMap::new()),
            state: Mutex::new(SessionState::Connected),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn capabilities(&self) -> ClientCapabilitySet {
        self.capabilities
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next` as one atomic step.
    ///
    /// Fails with the current state if `next` is not reachable from it, so
    /// of two concurrent callers making the same move only one succeeds.
    pub(crate) fn advance(&self, next: SessionState) -> Result<(), SessionState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_advance_to(next) {
            return Err(*state);
        }
        *state = next;
        Ok(())
    }

    pub fn context_value(&self, key: &str) -> Option<String> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set_context_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Identity bound into the execution context, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.context_value(USER_ID_CONTEXT_KEY)
            .as_deref()
            .and_then(Identity::parse)
    }

    /// Resolve this session's storage namespace under `project_root`.
    pub fn storage_namespace(&self, config: &StorageConfig, project_root: &Path) -> StorageNamespace {
        let user_id = self.context_value(USER_ID_CONTEXT_KEY);
        StorageNamespace::resolve(config, user_id.as_deref(), project_root)
    }
}
