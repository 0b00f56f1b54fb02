//! Workspace: a named scope of blobs and nets.
//!
//! A workspace exclusively owns the blobs and nets it creates. It may borrow
//! a parent ("shared") workspace, which is consulted only when a blob lookup
//! misses locally. Nets are never resolved through the parent.
//!
//! Mutating the blob and net maps needs `&mut Workspace`; running nets only
//! needs `&Workspace`, because every blob guards its own value.
//!
//! Design:
//! - Maps are plain (unsynchronized); the borrow checker enforces a single
//!   writer. Blob contents carry their own `RwLock`, so several threads can
//!   run nets against one `&Workspace` (concurrent plan substeps do).
//! - The parent is a borrow, not an `Arc`: a child can never outlive the
//!   workspace it reads through, and it can never remove the parent's blobs.
//! - Nets are declared before blobs in the struct, so on drop every net lets
//!   go of its handles before the blobs it points at disappear.
//! - Process-wide switches of older runtimes (pool capping, size report at
//!   exit) are `WorkspaceConfig` fields handed in at construction.
//!
//! # Example
//! ```ignore
//! let mut parent = Workspace::new();
//! parent.create_blob("weights").set(Tensor::filled(vec![4], 1.0));
//!
//! let mut child = Workspace::with_shared(&parent);
//! child.create_net(&net_def, false)?;   // output blobs land in `child`
//! child.run_net("train");               // reads `weights` through `parent`
//! ```

mod blobs;
mod diagnostics;
mod nets;

pub use self::diagnostics::{BlobSizeEntry, BlobSizeReport};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::WorkspaceConfig;
use crate::domain::{Blob, WorkspaceId};
use crate::error::ThreadPoolError;
use crate::ports::Net;
use crate::registry::{FactoryRegistry, ShapeRegistry};
use crate::thread_pool::{self, ThreadPool};

pub struct Workspace<'p> {
    id: WorkspaceId,
    config: WorkspaceConfig,

    // Nets are declared before blobs so they are dropped first.
    net_map: HashMap<String, Box<dyn Net>>,
    blob_map: IndexMap<String, Blob>,

    shared: Option<&'p Workspace<'p>>,

    registry: Arc<FactoryRegistry>,
    shapes: Arc<ShapeRegistry>,

    thread_pool: OnceLock<ThreadPool>,
    thread_pool_creation: Mutex<()>,
}

impl<'p> Workspace<'p> {
    /// Root workspace with default configuration and built-in registries.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: WorkspaceConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Child workspace reading blobs through `shared` on local misses.
    pub fn with_shared(shared: &'p Workspace<'p>) -> Self {
        Self::builder().shared(shared).build()
    }

    pub fn builder() -> WorkspaceBuilder<'p> {
        WorkspaceBuilder::default()
    }

    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn root_folder(&self) -> &Path {
        &self.config.root_folder
    }

    /// `path` joined onto the root folder, unless it is already absolute.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.root_folder.join(path)
        }
    }

    pub fn shared(&self) -> Option<&'p Workspace<'p>> {
        self.shared
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    pub fn shape_registry(&self) -> &ShapeRegistry {
        &self.shapes
    }

    /// The workspace's worker pool, built on first use.
    ///
    /// Concurrent first callers race on a mutex; exactly one pool is ever
    /// built and it lives as long as the workspace.
    pub fn thread_pool(&self) -> Result<&ThreadPool, ThreadPoolError> {
        if let Some(pool) = self.thread_pool.get() {
            return Ok(pool);
        }
        let _guard = self
            .thread_pool_creation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = self.thread_pool.get() {
            return Ok(pool);
        }

        let num_threads = thread_pool::pool_size(&self.config.thread_pool);
        info!(workspace = %self.id, "Constructing thread pool with {num_threads} threads");
        let pool = ThreadPool::new(num_threads)?;
        Ok(self.thread_pool.get_or_init(|| pool))
    }
}

impl Default for Workspace<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Workspace<'_> {
    fn drop(&mut self) {
        if self.config.print_blob_sizes_at_exit {
            self.print_blob_sizes();
        }
        debug!(
            workspace = %self.id,
            blobs = self.blob_map.len(),
            nets = self.net_map.len(),
            "dropping workspace"
        );
    }
}

impl std::fmt::Debug for Workspace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("blobs", &self.blob_map.len())
            .field("nets", &self.net_map.len())
            .field("shared", &self.shared.map(|s| s.id))
            .finish()
    }
}

/// Builder for workspaces that need a custom configuration or registries.
///
/// A child built with `shared` inherits the parent's registries unless they
/// are set explicitly.
#[derive(Default)]
pub struct WorkspaceBuilder<'p> {
    config: WorkspaceConfig,
    shared: Option<&'p Workspace<'p>>,
    registry: Option<Arc<FactoryRegistry>>,
    shapes: Option<Arc<ShapeRegistry>>,
}

impl<'p> WorkspaceBuilder<'p> {
    pub fn config(mut self, config: WorkspaceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn shared(mut self, shared: &'p Workspace<'p>) -> Self {
        self.shared = Some(shared);
        self
    }

    pub fn registry(mut self, registry: Arc<FactoryRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn shape_registry(mut self, shapes: Arc<ShapeRegistry>) -> Self {
        self.shapes = Some(shapes);
        self
    }

    pub fn build(self) -> Workspace<'p> {
        let registry = self
            .registry
            .or_else(|| self.shared.map(|s| Arc::clone(&s.registry)))
            .unwrap_or_else(|| Arc::new(FactoryRegistry::with_builtins()));
        let shapes = self
            .shapes
            .or_else(|| self.shared.map(|s| Arc::clone(&s.shapes)))
            .unwrap_or_else(|| Arc::new(ShapeRegistry::with_builtins()));

        let ws = Workspace {
            id: WorkspaceId::generate(),
            config: self.config,
            net_map: HashMap::new(),
            blob_map: IndexMap::new(),
            shared: self.shared,
            registry,
            shapes,
            thread_pool: OnceLock::new(),
            thread_pool_creation: Mutex::new(()),
        };
        debug!(workspace = %ws.id, shared = ?ws.shared.map(|s| s.id), "created workspace");
        ws
    }
}
