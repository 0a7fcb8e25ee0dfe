//! Model Context Protocol (MCP) server integration
//!
//! rmcp is the protocol engine; this module adapts its events to the session
//! subsystem.
//!
//! - **server**: per-connection `ServerHandler`; `initialize` drives
//!   [`crate::session::SessionLifecycle::on_connect`]
//! - **service**: Streamable HTTP service factory for the networked transport

pub mod server;
mod service;


pub use server::{StoragePathsParams, TaskMasterServer};
pub use service::create_mcp_service;
