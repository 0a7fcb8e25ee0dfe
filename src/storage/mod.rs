//! Per-user storage path resolution.

mod paths;


pub use paths::{NAMESPACE_DIR, NamespaceSource, StorageNamespace};
