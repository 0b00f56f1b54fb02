//! Workspace configuration.
//!
//! Everything that would otherwise be a process-wide flag lives here and is
//! handed to the workspace at construction time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Relative data paths (`Workspace::resolve_path`, the CLI's `--init`
    /// file) are resolved against this folder.
    #[serde(default = "default_root_folder")]
    pub root_folder: PathBuf,

    /// Print all local blob shapes and sizes when the workspace is dropped.
    #[serde(default)]
    pub print_blob_sizes_at_exit: bool,

    #[serde(default)]
    pub thread_pool: ThreadPoolConfig,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root_folder: default_root_folder(),
            print_blob_sizes_at_exit: false,
            thread_pool: ThreadPoolConfig::default(),
        }
    }
}

fn default_root_folder() -> PathBuf {
    PathBuf::from(".")
}

/// Sizing policy for the workspace thread pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPoolConfig {
    /// Explicit worker count. `None` means detected hardware concurrency.
    #[serde(default)]
    pub num_threads: Option<usize>,

    /// Cap the worker count on constrained devices (see `capped_thread_count`).
    #[serde(default = "default_apply_cap")]
    pub apply_cap: bool,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            apply_cap: default_apply_cap(),
        }
    }
}

/// Android caps by default, iOS and desktop targets do not.
fn default_apply_cap() -> bool {
    cfg!(target_os = "android")
}
