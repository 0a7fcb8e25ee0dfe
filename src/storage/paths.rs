//! Storage namespace resolution.
//!
//! Pure path arithmetic: nothing here touches the filesystem. Callers create
//! directories when they first write.

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::session::Identity;

/// Directory name of a task-master namespace root.
pub const NAMESPACE_DIR: &str = ".taskmaster";
const TASKS_DIR: &str = "tasks";
const TASKS_FILE: &str = "tasks.json";

/// Where a namespace root came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSource {
    /// `<user_root>/<identity>/.taskmaster`
    PerUser,
    /// `TASK_MASTER_STORAGE_ROOT`, verbatim
    FlatOverride,
    /// `<project_root>/.taskmaster`
    Project,
}

/// Resolved storage paths for one request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNamespace {
    base: PathBuf,
    tasks_dir: PathBuf,
    tasks_file: PathBuf,
    source: NamespaceSource,
}

impl StorageNamespace {
    /// Resolve the namespace for `identity` (raw, possibly a placeholder)
    /// under `project_root`.
    ///
    /// First match wins: a real identity selects a per-user root, then the
    /// flat override, then the project directory.
    pub fn resolve(config: &StorageConfig, identity: Option<&str>, project_root: &Path) -> Self {
        let identity = identity.and_then(Identity::parse);

        let (base, source) = match (identity, &config.flat_root) {
            (Some(id), _) => (
                config
                    .user_root
                    .join(id.path_component())
                    .join(NAMESPACE_DIR),
                NamespaceSource::PerUser,
            ),
            (None, Some(flat)) => (flat.clone(), NamespaceSource::FlatOverride),
            (None, None) => (project_root.join(NAMESPACE_DIR), NamespaceSource::Project),
        };

        let tasks_dir = base.join(TASKS_DIR);
        let tasks_file = tasks_dir.join(TASKS_FILE);
        Self {
            base,
            tasks_dir,
            tasks_file,
            source,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    pub fn tasks_file(&self) -> &Path {
        &self.tasks_file
    }

    pub fn source(&self) -> NamespaceSource {
        self.source
    }

    /// True when the namespace is private to one identity.
    pub fn is_isolated(&self) -> bool {
        self.source == NamespaceSource::PerUser
    }
}
