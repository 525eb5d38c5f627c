//! Storage regions and zero-copy export handles
//!
//! A `Storage` is the unit of ownership: one contiguous typed allocation,
//! shared by every view derived from it through an `Arc`. Views never hold a
//! reference to another view, only to the root `Storage`, so the ownership
//! graph has depth one and can never form a cycle. The region is reclaimed
//! when the last `Arc` drops.

use crate::data::{DType, Scalar};
use crate::buffer::Shape;
use std::sync::Arc;

/// Typed element array backing one storage region
#[derive(Debug)]
pub(crate) enum StorageData {
    Bool(Box<[bool]>),
    Int64(Box<[i64]>),
    Float64(Box<[f64]>),
    Str(Box<[Arc<str>]>),
}

/// One immutable typed allocation; the root owner of any number of views
#[derive(Debug)]
pub struct Storage {
    pub(crate) data: StorageData,
}

impl Storage {
    pub fn dtype(&self) -> DType {
        match &self.data {
            StorageData::Bool(_) => DType::Bool,
            StorageData::Int64(_) => DType::Int64,
            StorageData::Float64(_) => DType::Float64,
            StorageData::Str(_) => DType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            StorageData::Bool(v) => v.len(),
            StorageData::Int64(v) => v.len(),
            StorageData::Float64(v) => v.len(),
            StorageData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the element at a physical position
    pub(crate) fn get(&self, index: usize) -> Scalar {
        match &self.data {
            StorageData::Bool(v) => Scalar::Bool(v[index]),
            StorageData::Int64(v) => Scalar::Int64(v[index]),
            StorageData::Float64(v) => Scalar::Float64(v[index]),
            StorageData::Str(v) => Scalar::Str(v[index].clone()),
        }
    }
}

/// Zero-copy export descriptor for external interop.
///
/// Holds the owning `Arc`, so the storage region stays alive for as long as
/// the caller retains the handle — the same keep-alive contract views use
/// internally. Data accessors return the whole region; `offset` and the
/// strides locate the exported view inside it.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    pub(crate) storage: Arc<Storage>,
    pub(crate) dtype: DType,
    pub(crate) shape: Shape,
    pub(crate) offset: usize,
    pub(crate) row_stride: usize,
    pub(crate) col_stride: usize,
}

impl StorageHandle {
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Element strides as (row, column); the column stride is 0 for 1-D
    pub fn strides(&self) -> (usize, usize) {
        (self.row_stride, self.col_stride)
    }

    /// Identity of the backing region, for no-copy assertions
    pub fn storage_id(&self) -> usize {
        Arc::as_ptr(&self.storage) as usize
    }

    pub fn bool_data(&self) -> Option<&[bool]> {
        match &self.storage.data {
            StorageData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn int64_data(&self) -> Option<&[i64]> {
        match &self.storage.data {
            StorageData::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn float64_data(&self) -> Option<&[f64]> {
        match &self.storage.data {
            StorageData::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn str_data(&self) -> Option<&[Arc<str>]> {
        match &self.storage.data {
            StorageData::Str(v) => Some(v),
            _ => None,
        }
    }
}
