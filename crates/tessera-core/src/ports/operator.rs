use crate::domain::OperatorDef;
use crate::workspace::Workspace;

/// A single computation step bound to blobs of a workspace.
///
/// Operators resolve their input blobs and create their output blobs at
/// construction time, so `run` never has to change the shape of the
/// workspace.
pub trait Operator: Send + Sync {
    fn def(&self) -> &OperatorDef;

    fn run(&self, ws: &Workspace<'_>) -> bool;
}
