//! Domain model (ids, blobs, tensors, definitions).

pub mod blob;
pub mod defs;
pub mod ids;
pub mod tensor;

pub use blob::{Blob, BlobValue, TypeMeta};
pub use defs::{ExecutionStep, NetDef, OperatorDef, PlanDef, DEFAULT_NET_TYPE};
pub use ids::{ThreadPoolId, WorkspaceId};
pub use tensor::Tensor;
