//! Shape introspection for blob values.
//!
//! An explicit map from a value's `TypeId` to a function reporting its
//! dimensions and allocated bytes. Types without an entry are invisible to
//! the blob size report.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{BlobValue, Tensor};

/// What a shape function reports about a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobShape {
    pub dims: Vec<usize>,

    /// The value aliases storage owned by another blob.
    pub shares_data: bool,

    /// Allocated bytes.
    pub capacity: usize,
}

type ErasedShapeFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<BlobShape> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ShapeRegistry {
    fns: HashMap<TypeId, ErasedShapeFn>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that knows about the value types shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<Tensor>(|t| BlobShape {
            dims: t.dims().to_vec(),
            shares_data: t.shares_data(),
            capacity: t.capacity_bytes(),
        });
        registry
    }

    /// Register (or replace) the shape function for `T`.
    pub fn register<T: Any>(&mut self, f: fn(&T) -> BlobShape) {
        let erased: ErasedShapeFn = Arc::new(move |value: &(dyn Any + Send + Sync)| {
            value.downcast_ref::<T>().map(f)
        });
        self.fns.insert(TypeId::of::<T>(), erased);
    }

    pub fn has<T: Any>(&self) -> bool {
        self.fns.contains_key(&TypeId::of::<T>())
    }

    /// Shape of a blob's value; `None` if empty or its type is unregistered.
    pub fn shape_of(&self, value: &BlobValue) -> Option<BlobShape> {
        let meta = value.meta()?;
        let f = self.fns.get(&meta.id())?;
        f(value.as_any()?)
    }
}

impl fmt::Debug for ShapeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeRegistry")
            .field("types", &self.fns.len())
            .finish()
    }
}
