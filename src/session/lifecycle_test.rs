use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;

use axum::http::{HeaderMap, HeaderValue};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use super::*;
use crate::providers::{MCP_PROVIDER, MockProvider, Provider, ProviderRegistry, RegistryError};

fn lifecycle() -> (SessionLifecycle, Arc<ProviderRegistry>) {
    let registry = Arc::new(ProviderRegistry::new());
    (SessionLifecycle::new(Arc::clone(&registry)), registry)
}

fn sampling_session(id: &str) -> Session {
    Session::new(id, TransportKind::Http, ClientCapabilitySet { sampling: true })
}

fn plain_session(id: &str) -> Session {
    Session::new(id, TransportKind::Http, ClientCapabilitySet::default())
}

fn provider_for(session_id: &str) -> Arc<dyn Provider> {
    let mut mock = MockProvider::new();
    let id = session_id.to_string();
    mock.expect_session_id().returning(move || id.clone());
    Arc::new(mock)
}

fn user_headers(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_static(value));
    headers
}

/// Collects the message of every event emitted while installed.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<String>>>);

impl CapturedLogs {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn position(&self, needle: &str) -> Option<usize> {
        self.messages().iter().position(|m| m.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.0.lock().unwrap().push(message);
        }
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, logs)
}

#[test]
fn test_connect_binds_identity_and_registers() {
    let (lifecycle, registry) = lifecycle();
    let session = sampling_session("s1");
    let headers = user_headers("test-user-123");

    let outcome = lifecycle.on_connect(&session, Some(&headers), || provider_for("s1"));

    assert_eq!(outcome, ProviderOutcome::Registered);
    assert_eq!(session.state(), SessionState::ProviderRegistered);
    assert_eq!(
        session.context_value(USER_ID_CONTEXT_KEY).as_deref(),
        Some("test-user-123")
    );
    assert_eq!(
        registry.get_provider(MCP_PROVIDER).unwrap().session_id(),
        "s1"
    );
}

#[test]
fn test_connect_without_sampling_skips_registration() {
    let (lifecycle, registry) = lifecycle();
    let session = plain_session("s1");

    let outcome = lifecycle.on_connect(&session, None, || {
        panic!("provider must not be built without sampling")
    });

    assert_eq!(
        outcome,
        ProviderOutcome::Skipped(SkipReason::MissingCapability("sampling"))
    );
    assert_eq!(session.state(), SessionState::ProviderSkipped);
    assert!(registry.is_empty());
}

#[test]
fn test_connect_is_logged_before_registration() {
    let (lifecycle, _registry) = lifecycle();
    let session = sampling_session("s1");
    let headers = user_headers("alice");

    let (outcome, logs) = with_captured_logs(|| {
        lifecycle.on_connect(&session, Some(&headers), || provider_for("s1"))
    });

    assert_eq!(outcome, ProviderOutcome::Registered);
    let connected = logs.position("Session connected").expect("connect logged");
    let registered = logs.position("Registered provider").expect("registration logged");
    assert!(connected < registered, "{:?}", logs.messages());
}

#[test]
fn test_skipped_registration_is_logged() {
    let (lifecycle, _registry) = lifecycle();
    let session = plain_session("s1");

    let (_, logs) = with_captured_logs(|| {
        lifecycle.on_connect(&session, None, || provider_for("s1"))
    });

    let connected = logs.position("Session connected").expect("connect logged");
    let skipped = logs
        .position("Client lacks sampling capability")
        .expect("skip logged");
    assert!(connected < skipped);
    assert!(logs.position("Registered provider").is_none());
}

#[test]
fn test_disconnect_during_registration_releases_provider() {
    let (lifecycle, registry) = lifecycle();
    let session = sampling_session("s1");

    let (outcome, logs) = with_captured_logs(|| {
        lifecycle.on_connect(&session, None, || {
            lifecycle.on_disconnect(&session);
            provider_for("s1")
        })
    });

    assert_eq!(outcome, ProviderOutcome::Skipped(SkipReason::SessionClosed));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(registry.is_empty());
    assert!(logs.position("Failed to release provider").is_none());
}

#[test]
fn test_stdio_session_has_no_identity() {
    let (lifecycle, _registry) = lifecycle();
    let session = Session::new("s1", TransportKind::Stdio, ClientCapabilitySet::default());

    lifecycle.on_connect(&session, None, || provider_for("s1"));

    assert!(session.identity().is_none());
    assert!(session.context_value(USER_ID_CONTEXT_KEY).is_none());
}

#[test]
fn test_placeholder_header_is_not_bound() {
    let (lifecycle, _registry) = lifecycle();
    let session = plain_session("s1");
    let headers = user_headers("{{LIBRECHAT_USER_ID}}");

    lifecycle.on_connect(&session, Some(&headers), || provider_for("s1"));

    assert!(session.context_value(USER_ID_CONTEXT_KEY).is_none());
    assert_eq!(session.state(), SessionState::ProviderSkipped);
}

#[test]
fn test_registry_failure_is_absorbed() {
    let (lifecycle, registry) = lifecycle();
    registry.poison();
    let session = sampling_session("s1");
    let headers = user_headers("alice");

    let outcome = lifecycle.on_connect(&session, Some(&headers), || provider_for("s1"));

    assert_eq!(
        outcome,
        ProviderOutcome::Failed(RegistryError::Poisoned {
            name: MCP_PROVIDER.to_string()
        })
    );
    // Identity binding still happened; the session keeps working.
    assert_eq!(session.identity().unwrap().as_str(), "alice");
    assert_eq!(session.state(), SessionState::ProviderSkipped);
}

#[test]
fn test_connect_runs_once() {
    let (lifecycle, _registry) = lifecycle();
    let session = sampling_session("s1");

    assert_eq!(
        lifecycle.on_connect(&session, None, || provider_for("s1")),
        ProviderOutcome::Registered
    );
    assert_eq!(
        lifecycle.on_connect(&session, None, || provider_for("s1")),
        ProviderOutcome::Skipped(SkipReason::AlreadyConnected)
    );
}

#[test]
fn test_newer_session_supersedes_older() {
    let (lifecycle, registry) = lifecycle();
    let old = sampling_session("old");
    let new = sampling_session("new");

    lifecycle.on_connect(&old, None, || provider_for("old"));
    lifecycle.on_connect(&new, None, || provider_for("new"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get_provider(MCP_PROVIDER).unwrap().session_id(), "new");

    // Old session going away leaves the newer provider alone.
    lifecycle.on_disconnect(&old);
    assert_eq!(registry.get_provider(MCP_PROVIDER).unwrap().session_id(), "new");

    lifecycle.on_disconnect(&new);
    assert!(registry.get_provider(MCP_PROVIDER).is_none());
}

#[test]
fn test_disconnect_is_idempotent() {
    let (lifecycle, registry) = lifecycle();
    let session = sampling_session("s1");
    lifecycle.on_connect(&session, None, || provider_for("s1"));

    lifecycle.on_disconnect(&session);
    lifecycle.on_disconnect(&session);

    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(registry.is_empty());
}

#[test]
fn test_connect_after_disconnect_registers_nothing() {
    let (lifecycle, registry) = lifecycle();
    let session = sampling_session("s1");
    lifecycle.on_disconnect(&session);

    let outcome = lifecycle.on_connect(&session, None, || provider_for("s1"));

    assert_eq!(outcome, ProviderOutcome::Skipped(SkipReason::AlreadyConnected));
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_sessions_keep_separate_identities() {
    let (lifecycle, registry) = lifecycle();
    let lifecycle = Arc::new(lifecycle);

    let handles: Vec<_> = ["alice", "bob", "carol", "dave"]
        .into_iter()
        .map(|user| {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || {
                let session = sampling_session(user);
                let headers = user_headers(user);
                lifecycle.on_connect(&session, Some(&headers), || provider_for(user));
                session
            })
        })
        .collect();

    for (handle, user) in handles.into_iter().zip(["alice", "bob", "carol", "dave"]) {
        let session = handle.join().unwrap();
        assert_eq!(session.identity().unwrap().as_str(), user);
    }
    assert_eq!(registry.len(), 1);
}
