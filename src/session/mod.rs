//! Session identity, execution context and lifecycle.
//!
//! - **identity**: extracting an end-user identity from transport metadata
//! - **state**: the per-connection [`Session`] and its execution context
//! - **lifecycle**: connect/disconnect handling and provider registration

mod identity;
mod lifecycle;
mod state;

#[cfg(test)]
mod lifecycle_test;

pub use identity::{Identity, USER_ID_HEADER, authenticate, is_template_placeholder};
pub use lifecycle::{ProviderOutcome, SessionLifecycle, SkipReason};
pub use state::{
    ClientCapabilitySet, Session, SessionState, TransportKind, USER_ID_CONTEXT_KEY,
};
