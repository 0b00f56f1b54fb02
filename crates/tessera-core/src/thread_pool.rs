//! Worker pool used by operators for data-parallel work.
//!
//! The pool is a multi-threaded tokio runtime with a fixed number of worker
//! threads. Each workspace lazily builds at most one pool and drops it with
//! itself (see `Workspace::thread_pool`).
//!
//! Callers block on the pool, so `run` / `map` must not be called from
//! inside another async runtime.
//!
//! # Example
//! ```ignore
//! let pool = ws.thread_pool()?;
//! let sums = pool.map(chunks, |chunk: Vec<f32>| chunk.iter().sum::<f32>())?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::ThreadPoolConfig;
use crate::domain::ThreadPoolId;
use crate::error::ThreadPoolError;

pub struct ThreadPool {
    id: ThreadPoolId,
    num_threads: usize,
    runtime: tokio::runtime::Runtime,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> Result<Self, ThreadPoolError> {
        let num_threads = num_threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(num_threads)
            .thread_name("tessera-worker")
            .build()
            .map_err(|source| ThreadPoolError::Build {
                threads: num_threads,
                source,
            })?;
        Ok(Self {
            id: ThreadPoolId::generate(),
            num_threads,
            runtime,
        })
    }

    pub fn id(&self) -> ThreadPoolId {
        self.id
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Apply `f` to every item on the worker threads and collect the results
    /// in input order. Blocks until all items are done.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>, ThreadPoolError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.runtime.spawn(async move { f(item) })
            })
            .collect();
        debug!(pool = %self.id, tasks = handles.len(), "dispatched pool tasks");

        self.runtime.block_on(async move {
            let mut results = Vec::with_capacity(handles.len());
            for (index, handle) in handles.into_iter().enumerate() {
                let result = handle.await.map_err(|e| ThreadPoolError::Task {
                    index,
                    reason: e.to_string(),
                })?;
                results.push(result);
            }
            Ok(results)
        })
    }

    /// Run `f(i)` for every `i` in `0..range`.
    pub fn run<F>(&self, range: usize, f: F) -> Result<(), ThreadPoolError>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.map((0..range).collect(), f).map(|_| ())
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("id", &self.id)
            .field("num_threads", &self.num_threads)
            .finish()
    }
}

/// Worker count for constrained devices.
///
/// - 1-3 cores: unchanged
/// - 4-5 cores: 3 threads
/// - more: half the cores
pub fn capped_thread_count(detected: usize) -> usize {
    match detected {
        0..=3 => detected,
        4..=5 => 3,
        n => n / 2,
    }
}

/// Hardware concurrency, or 1 if it cannot be detected.
pub fn detected_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Number of workers a pool built from `config` gets.
pub fn pool_size(config: &ThreadPoolConfig) -> usize {
    let n = config.num_threads.unwrap_or_else(detected_thread_count);
    let n = if config.apply_cap {
        capped_thread_count(n)
    } else {
        n
    };
    n.max(1)
}
