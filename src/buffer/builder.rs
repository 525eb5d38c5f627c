//! The only mutable phase of a buffer's life.
//!
//! A builder is the `Building` state of the buffer state machine. It is a
//! plain owned value, never shared, so its mutability is invisible to any
//! other caller. `freeze` consumes it and produces the one and only
//! `Frozen` buffer over the finished region; there is no path back.

use crate::buffer::{Buffer, Shape, Storage, StorageData};
use crate::data::{DType, Scalar};
use crate::{BasaltError, Result};
use std::sync::Arc;

enum BuilderData {
    Bool(Vec<bool>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Str(Vec<Arc<str>>),
}

/// Accumulates elements of one type, then freezes into an immutable [`Buffer`]
pub struct BufferBuilder {
    data: BuilderData,
}

impl BufferBuilder {
    pub fn new(dtype: DType) -> Self {
        Self::with_capacity(dtype, 0)
    }

    pub fn with_capacity(dtype: DType, capacity: usize) -> Self {
        let data = match dtype {
            DType::Bool => BuilderData::Bool(Vec::with_capacity(capacity)),
            DType::Int64 => BuilderData::Int64(Vec::with_capacity(capacity)),
            DType::Float64 => BuilderData::Float64(Vec::with_capacity(capacity)),
            DType::Str => BuilderData::Str(Vec::with_capacity(capacity)),
        };
        Self { data }
    }

    pub fn dtype(&self) -> DType {
        match &self.data {
            BuilderData::Bool(_) => DType::Bool,
            BuilderData::Int64(_) => DType::Int64,
            BuilderData::Float64(_) => DType::Float64,
            BuilderData::Str(_) => DType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            BuilderData::Bool(v) => v.len(),
            BuilderData::Int64(v) => v.len(),
            BuilderData::Float64(v) => v.len(),
            BuilderData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one value; the value must match the builder's element type
    pub fn push(&mut self, value: Scalar) -> Result<()> {
        let target = self.dtype();
        match (&mut self.data, value) {
            (BuilderData::Bool(v), Scalar::Bool(x)) => v.push(x),
            (BuilderData::Int64(v), Scalar::Int64(x)) => v.push(x),
            (BuilderData::Float64(v), Scalar::Float64(x)) => v.push(x),
            (BuilderData::Str(v), Scalar::Str(x)) => v.push(x),
            (_, value) => {
                return Err(BasaltError::TypeMismatch {
                    left: target,
                    right: value.dtype(),
                })
            }
        }
        Ok(())
    }

    /// Append one value, widening it along the promotion lattice as needed
    pub fn push_promoting(&mut self, value: Scalar) -> Result<()> {
        let target = self.dtype();
        let source = value.dtype();
        match value.cast(target) {
            Some(v) => self.push(v),
            None => Err(BasaltError::TypeMismatch {
                left: source,
                right: target,
            }),
        }
    }

    fn into_storage(self) -> Arc<Storage> {
        let data = match self.data {
            BuilderData::Bool(v) => StorageData::Bool(v.into_boxed_slice()),
            BuilderData::Int64(v) => StorageData::Int64(v.into_boxed_slice()),
            BuilderData::Float64(v) => StorageData::Float64(v.into_boxed_slice()),
            BuilderData::Str(v) => StorageData::Str(v.into_boxed_slice()),
        };
        Arc::new(Storage { data })
    }

    /// Freeze into a one-dimensional buffer
    pub fn freeze(self) -> Buffer {
        let len = self.len();
        Buffer::from_storage(self.into_storage(), Shape::One(len))
    }

    /// Freeze into a two-dimensional, column-major buffer.
    ///
    /// Elements must have been pushed column by column; the accumulated
    /// length must equal `rows * cols`.
    pub fn freeze_columns(self, rows: usize, cols: usize) -> Result<Buffer> {
        let shape = Shape::Two { rows, cols };
        if self.len() != rows * cols {
            return Err(BasaltError::ShapeMismatch {
                expected: shape,
                actual: Shape::One(self.len()),
            });
        }
        Ok(Buffer::from_storage(self.into_storage(), shape))
    }
}
