//! Dense `f32` tensor, the main value type stored in blobs.
//!
//! Design:
//! - Elements live behind an `Arc`, so `share_data` aliases another tensor's
//!   buffer without copying it.
//! - Writes are copy-on-write. A tensor that writes while its buffer is
//!   shared gets a private copy first, and the other holder keeps the old
//!   elements.
//! - `shares_data` is true only for an alias whose buffer is still held by
//!   someone else. An alias left as the last holder owns those bytes and is
//!   counted in the blob size report like any other tensor.
//! - `Clone` copies the elements. Aliasing is always explicit.

use std::sync::Arc;

#[derive(Debug)]
pub struct Tensor {
    dims: Vec<usize>,
    data: Arc<Vec<f32>>,

    /// Created by `share_data` and not written to since.
    alias: bool,
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Self {
            dims: self.dims.clone(),
            data: Arc::new(self.data.as_ref().clone()),
            alias: false,
        }
    }
}

impl Tensor {
    /// Tensor of the given shape filled with `value`.
    pub fn filled(dims: Vec<usize>, value: f32) -> Self {
        let len = dims.iter().product();
        Self {
            dims,
            data: Arc::new(vec![value; len]),
            alias: false,
        }
    }

    /// Build from raw data; `None` if the element count does not match `dims`.
    pub fn from_vec(dims: Vec<usize>, data: Vec<f32>) -> Option<Self> {
        if dims.iter().product::<usize>() != data.len() {
            return None;
        }
        Some(Self {
            dims,
            data: Arc::new(data),
            alias: false,
        })
    }

    /// A tensor aliasing `other`'s buffer. No elements are copied.
    pub fn share_data(other: &Tensor) -> Self {
        Self {
            dims: other.dims.clone(),
            data: Arc::clone(&other.data),
            alias: true,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable elements. A shared buffer is copied first.
    pub fn data_mut(&mut self) -> &mut [f32] {
        self.alias = false;
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Whether `self` and `other` read the same buffer.
    pub fn same_buffer(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn shares_data(&self) -> bool {
        self.alias && Arc::strong_count(&self.data) > 1
    }

    /// Allocated bytes of the backing buffer.
    pub fn capacity_bytes(&self) -> usize {
        self.data.capacity() * std::mem::size_of::<f32>()
    }
}
