//! tessera-core
//!
//! Workspaces for a dataflow runtime: named blobs, nets built from
//! definitions, plans that drive nets in steps, and a lazily built worker
//! pool per workspace.
//!
//! # Modules
//! - **domain**: blobs, tensors, net/operator/plan definitions, ids
//! - **ports**: the `Net` and `Operator` traits
//! - **registry**: factories for nets and operators, blob shape functions
//! - **impls**: the `simple` net and built-in operators
//! - **workspace**: the blob store, net registry and run entry points
//! - **plan**: execution of plans against a workspace
//! - **thread_pool**: the worker pool and its sizing policy

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod plan;
pub mod ports;
pub mod registry;
pub mod thread_pool;
pub mod workspace;

pub use config::{ThreadPoolConfig, WorkspaceConfig};
pub use domain::{Blob, ExecutionStep, NetDef, OperatorDef, PlanDef, Tensor};
pub use error::{ConstructionError, PlanError, WorkspaceError};
pub use ports::{Net, Operator};
pub use registry::{FactoryRegistry, ShapeRegistry};
pub use thread_pool::ThreadPool;
pub use workspace::{BlobSizeReport, Workspace, WorkspaceBuilder};
