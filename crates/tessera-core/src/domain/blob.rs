//! Blob: a type-erased value cell.
//!
//! A `Blob` holds at most one value of any `Send + Sync + 'static` type. The
//! value sits behind a reader/writer lock, so a blob handed out through a
//! shared reference (for instance one resolved from a parent workspace) can
//! still be written by whoever holds the handle. Ownership of the cell itself
//! never moves: it stays in the map of the workspace that created it.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::BlobError;

/// Runtime type tag of a blob's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeMeta {
    id: TypeId,
    name: &'static str,
}

impl TypeMeta {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The value held by a blob, as seen through a read or write guard.
#[derive(Default)]
pub struct BlobValue {
    meta: Option<TypeMeta>,
    data: Option<Box<dyn Any + Send + Sync>>,
}

impl BlobValue {
    /// Type of the held value, `None` when empty.
    pub fn meta(&self) -> Option<TypeMeta> {
        self.meta
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.meta.is_some_and(|m| m.id() == TypeId::of::<T>())
    }

    pub fn get<T: Any>(&self) -> Result<&T, BlobError> {
        let data = self.data.as_deref().ok_or(BlobError::Empty)?;
        let actual = self.type_name();
        data.downcast_ref::<T>().ok_or(BlobError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual,
        })
    }

    pub fn get_mut<T: Any>(&mut self) -> Result<&mut T, BlobError> {
        let actual = self.type_name();
        let data = self.data.as_deref_mut().ok_or(BlobError::Empty)?;
        data.downcast_mut::<T>().ok_or(BlobError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual,
        })
    }

    /// Mutable access to a `T`, replacing whatever else was stored with
    /// `T::default()` first.
    pub fn get_or_insert_default<T>(&mut self) -> &mut T
    where
        T: Any + Default + Send + Sync,
    {
        if !self.is::<T>() {
            self.set(T::default());
        }
        match self.data.as_deref_mut().and_then(|d| d.downcast_mut::<T>()) {
            Some(value) => value,
            None => unreachable!("blob value was just set to {}", std::any::type_name::<T>()),
        }
    }

    /// Replace the held value, dropping the previous one.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.meta = Some(TypeMeta::of::<T>());
        self.data = Some(Box::new(value));
    }

    /// Drop the held value and return to the empty state.
    pub fn reset(&mut self) {
        self.meta = None;
        self.data = None;
    }

    /// Raw view used by shape introspection.
    pub fn as_any(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.data.as_deref()
    }

    fn type_name(&self) -> &'static str {
        self.meta.map_or("nothing", |m| m.name())
    }
}

impl fmt::Debug for BlobValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobValue")
            .field("type", &self.type_name())
            .finish()
    }
}

/// A named cell owned by exactly one workspace.
#[derive(Debug, Default)]
pub struct Blob {
    value: RwLock<BlobValue>,
}

impl Blob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, BlobValue> {
        self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, BlobValue> {
        self.value.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        self.write().set(value);
    }

    pub fn meta(&self) -> Option<TypeMeta> {
        self.read().meta()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Clone the held value out of the blob.
    pub fn get_cloned<T: Any + Clone>(&self) -> Result<T, BlobError> {
        self.read().get::<T>().cloned()
    }
}
