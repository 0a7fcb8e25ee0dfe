//! Task Master MCP server binary.

use clap::Parser;
use miette::Result;
use taskmaster_mcp::cli::Cli;
use taskmaster_mcp::server;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config();
    server::run(config).await?;
    Ok(())
}
