//! Capability providers and the registry that holds them.

mod registry;
mod sampling;


#[cfg(test)]
pub use registry::MockProvider;
pub use registry::{Provider, ProviderError, ProviderRegistry, RegistryError};
pub use sampling::{MCP_PROVIDER, McpSamplingProvider};
