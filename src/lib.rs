//! Multi-tenant MCP server for task-master.
//!
//! Serves AI-agent clients over stdio or Streamable HTTP while keeping each
//! user's storage namespace and each connection's providers isolated.

pub mod cli;
pub mod config;
pub mod mcp;
pub mod providers;
pub mod server;
pub mod session;
pub mod storage;

#[cfg(test)]
#[path = "cli_test.rs"]
mod cli_test;
