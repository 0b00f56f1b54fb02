//! Strongly-typed identifiers.
//!
//! Ids are ULIDs tagged with a zero-sized marker type, so a `WorkspaceId`
//! can never be passed where a `ThreadPoolId` is expected. They only show up
//! in logs, where the time-ordered ULID makes parent/child workspaces easy to
//! tell apart.

use std::fmt;
use std::marker::PhantomData;

use ulid::Ulid;

/// Marker trait providing the display prefix of an id type.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Allocate a fresh id.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Workspace {}

impl IdMarker for Workspace {
    fn prefix() -> &'static str {
        "ws-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThreadPool {}

impl IdMarker for ThreadPool {
    fn prefix() -> &'static str {
        "pool-"
    }
}

/// Identifier of a workspace instance.
pub type WorkspaceId = Id<Workspace>;

/// Identifier of a constructed thread pool.
pub type ThreadPoolId = Id<ThreadPool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        let ws = WorkspaceId::generate();
        let pool = ThreadPoolId::generate();
        assert!(ws.to_string().starts_with("ws-"));
        assert!(pool.to_string().starts_with("pool-"));
    }

    #[test]
    fn from_ulid_roundtrip() {
        let ulid = Ulid::new();
        let id: WorkspaceId = ulid.into();
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn marker_does_not_consume_memory() {
        assert_eq!(std::mem::size_of::<WorkspaceId>(), std::mem::size_of::<Ulid>());
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(WorkspaceId::generate(), WorkspaceId::generate());
    }
}
