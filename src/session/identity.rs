//! End-user identity and its extraction from transport metadata.

use std::fmt;

use axum::http::HeaderMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Header carrying the end-user id on the networked transport.
///
/// `HeaderMap` lookups are case-insensitive, so `X-User-Id` matches too.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Bytes kept verbatim in a storage path component.
const PATH_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'_')
    .remove(b'@')
    .remove(b'-');

/// Marker that opens an unrendered template such as `{{LIBRECHAT_USER_ID}}`.
const TEMPLATE_OPEN: &str = "{{";

/// An opaque end-user identifier.
///
/// Only constructed through [`Identity::parse`], so an `Identity` is never
/// empty and never a template placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Parse a raw value. Blank values and template placeholders yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_template_placeholder(trimmed) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encode the identity as exactly one path component.
    ///
    /// Bytes outside `[A-Za-z0-9._@-]` become `%XX`, including `%` itself,
    /// and `.`/`..` are fully encoded. The mapping is injective, so distinct
    /// identities never share a directory.
    pub fn path_component(&self) -> String {
        match self.0.as_str() {
            "." => "%2E".to_string(),
            ".." => "%2E%2E".to_string(),
            id => utf8_percent_encode(id, PATH_COMPONENT).to_string(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True for values that are an unrendered template, e.g. `{{user}}`.
pub fn is_template_placeholder(value: &str) -> bool {
    value.trim_start().starts_with(TEMPLATE_OPEN)
}

/// Derive the identity of a connection from its transport metadata.
///
/// `headers` is `None` on the stdio transport. Missing, non-UTF-8, blank and
/// placeholder values all degrade to "no identity".
pub fn authenticate(headers: Option<&HeaderMap>) -> Option<Identity> {
    let value = headers?.get(USER_ID_HEADER)?;
    Identity::parse(value.to_str().ok()?)
}
