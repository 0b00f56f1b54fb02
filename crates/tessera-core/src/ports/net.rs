use crate::domain::NetDef;
use crate::workspace::Workspace;

/// An executable graph owned by a workspace.
///
/// Nets are built once by a net factory (which may create blobs in the
/// workspace) and then run any number of times. Running only needs shared
/// access to the workspace; blob contents are written through their own
/// locks.
///
/// Dropping a net releases whatever it holds. The workspace relies on this
/// when a net is overwritten: the old instance is dropped before the
/// replacement is constructed.
pub trait Net: Send + Sync {
    fn name(&self) -> &str;

    fn def(&self) -> &NetDef;

    /// Run the whole graph once. `false` signals a recoverable failure that
    /// the caller logs.
    fn run(&self, ws: &Workspace<'_>) -> bool;
}
