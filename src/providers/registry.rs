//! Process-wide registry of capability providers.
//!
//! Tool handlers have no session reference, so the current provider for a
//! capability is looked up here by name. Each slot holds one provider; a
//! newer registration replaces the older one.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use miette::Diagnostic;
use rmcp::model::{CreateMessageRequestParams, CreateMessageResult};
use thiserror::Error;
use tracing::{debug, warn};

/// A capability backend bound to one session.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Id of the session that owns this provider.
    fn session_id(&self) -> String;

    /// Ask the backing client to generate a message.
    async fn create_message(
        &self,
        request: CreateMessageRequestParams,
    ) -> Result<CreateMessageResult, ProviderError>;
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Sampling request to session '{session_id}' failed: {message}")]
    #[diagnostic(
        code(taskmaster::providers::sampling),
        help("The client may have disconnected or declined the request.")
    )]
    Sampling { session_id: String, message: String },
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Provider registry lock poisoned (slot '{name}')")]
    #[diagnostic(
        code(taskmaster::providers::poisoned),
        help("A previous registry update panicked; restart the server to recover.")
    )]
    Poisoned { name: String },
}

static GLOBAL: LazyLock<Arc<ProviderRegistry>> = LazyLock::new(|| Arc::new(ProviderRegistry::new()));

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first access.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Insert or replace the provider for `name`.
    ///
    /// Returns the provider that was replaced, if any.
    pub fn register_provider(
        &self,
        name: &str,
        provider: Arc<dyn Provider>,
    ) -> Result<Option<Arc<dyn Provider>>, RegistryError> {
        let mut providers = self.providers.write().map_err(|_| RegistryError::Poisoned {
            name: name.to_string(),
        })?;
        let previous = providers.insert(name.to_string(), provider);
        if let Some(old) = &previous {
            debug!(
                provider = name,
                previous_session = %old.session_id(),
                "Replaced provider"
            );
        }
        Ok(previous)
    }

    pub fn get_provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        match self.providers.read() {
            Ok(providers) => providers.get(name).cloned(),
            Err(_) => {
                warn!(provider = name, "Provider registry lock poisoned");
                None
            }
        }
    }

    /// Remove `name` only if its current provider belongs to `session_id`.
    ///
    /// A newer session's provider in the same slot is left in place.
    pub fn unregister_session(&self, name: &str, session_id: &str) -> Result<bool, RegistryError> {
        let mut providers = self.providers.write().map_err(|_| RegistryError::Poisoned {
            name: name.to_string(),
        })?;
        let owned = providers
            .get(name)
            .is_some_and(|p| p.session_id() == session_id);
        if owned {
            providers.remove(name);
        }
        Ok(owned)
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.providers.read() {
            Ok(providers) => providers.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registration.
    pub fn clear(&self) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.clear();
        drop(providers);
        self.providers.clear_poison();
    }

    /// Poison the lock, as a panicking writer would.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.providers.write();
            panic!("poisoning provider registry");
        }));
    }
}
