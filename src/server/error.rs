use miette::Diagnostic;
use thiserror::Error;

/// Transport startup and runtime failures. All of them end the process.
#[derive(Error, Diagnostic, Debug)]
pub enum ServerError {
    #[error("Failed to bind MCP HTTP transport on {host}:{port} (endpoint {endpoint}): {source}")]
    #[diagnostic(
        code(taskmaster::server::bind),
        help("Check that HOST is a local address and PORT is free, or unset MCP_HTTP_ENABLED to use stdio.")
    )]
    Bind {
        host: String,
        port: u16,
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP HTTP transport failed: {source}")]
    #[diagnostic(code(taskmaster::server::serve))]
    Serve {
        #[source]
        source: std::io::Error,
    },

    #[error("MCP stdio transport failed: {message}")]
    #[diagnostic(code(taskmaster::server::stdio))]
    Stdio { message: String },
}

pub type ServerResult<T> = Result<T, ServerError>;
