//! Immutable typed buffers with no-copy views
//!
//! A [`Buffer`] is an immutable, typed, contiguous-or-strided region: an
//! `Arc` to a root [`Storage`] plus offset, shape and stride metadata.
//! Slicing, column extraction, reshape and transpose produce new buffers
//! that alias the same storage; only `astype` and `concat` allocate.
//!
//! State machine: `Building` ([`BufferBuilder`], never shared) → `Frozen`
//! (`Buffer`, arbitrarily many co-owners) → `Reclaimed` (last `Arc` drops).
//! No transition returns to `Building`.

mod builder;
mod storage;

pub use builder::BufferBuilder;
pub use storage::{Storage, StorageHandle};
pub(crate) use storage::StorageData;

use crate::data::{DType, Scalar};
use crate::{BasaltError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Logical extent of a buffer: one or two dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    One(usize),
    Two { rows: usize, cols: usize },
}

impl Shape {
    pub fn rows(&self) -> usize {
        match self {
            Shape::One(n) => *n,
            Shape::Two { rows, .. } => *rows,
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Shape::One(_) => 1,
            Shape::Two { cols, .. } => *cols,
        }
    }

    /// Total element count
    pub fn len(&self) -> usize {
        match self {
            Shape::One(n) => *n,
            Shape::Two { rows, cols } => rows * cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An immutable typed view over shared storage.
///
/// Cloning a buffer clones metadata and bumps the storage refcount; element
/// bytes are never duplicated. Two-dimensional buffers are column-major, so
/// a single column (and any contiguous run of columns) is a contiguous
/// element range of the underlying region.
#[derive(Debug, Clone)]
pub struct Buffer {
    storage: Arc<Storage>,
    offset: usize,
    shape: Shape,
    row_stride: usize,
    col_stride: usize,
}

impl Buffer {
    /// Wrap a finished storage region with contiguous column-major strides.
    /// This is the single freezing point; called only from the builder and
    /// the typed constructors.
    pub(crate) fn from_storage(storage: Arc<Storage>, shape: Shape) -> Self {
        let (row_stride, col_stride) = match shape {
            Shape::One(_) => (1, 0),
            Shape::Two { rows, .. } => (1, rows),
        };
        Self {
            storage,
            offset: 0,
            shape,
            row_stride,
            col_stride,
        }
    }

    pub fn from_bool(data: Vec<bool>) -> Self {
        let len = data.len();
        let storage = Arc::new(Storage {
            data: StorageData::Bool(data.into_boxed_slice()),
        });
        Self::from_storage(storage, Shape::One(len))
    }

    pub fn from_i64(data: Vec<i64>) -> Self {
        let len = data.len();
        let storage = Arc::new(Storage {
            data: StorageData::Int64(data.into_boxed_slice()),
        });
        Self::from_storage(storage, Shape::One(len))
    }

    pub fn from_f64(data: Vec<f64>) -> Self {
        let len = data.len();
        let storage = Arc::new(Storage {
            data: StorageData::Float64(data.into_boxed_slice()),
        });
        Self::from_storage(storage, Shape::One(len))
    }

    pub fn from_str_values<I, S>(data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<Arc<str>> = data.into_iter().map(|s| Arc::from(s.as_ref())).collect();
        let len = values.len();
        let storage = Arc::new(Storage {
            data: StorageData::Str(values.into_boxed_slice()),
        });
        Self::from_storage(storage, Shape::One(len))
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn row_count(&self) -> usize {
        self.shape.rows()
    }

    pub fn col_count(&self) -> usize {
        self.shape.cols()
    }

    pub fn len(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Element strides as (row, column); the column stride is 0 for 1-D
    pub fn strides(&self) -> (usize, usize) {
        (self.row_stride, self.col_stride)
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// Identity of the backing region. Equal ids mean shared storage; tests
    /// assert no-copy behavior with this, never with element values.
    pub fn storage_id(&self) -> usize {
        Arc::as_ptr(&self.storage) as usize
    }

    /// Whether two buffers alias the same storage region
    pub fn shares_storage(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Whether elements occupy one gap-free ascending run of the region
    pub fn is_contiguous(&self) -> bool {
        match self.shape {
            Shape::One(n) => n <= 1 || self.row_stride == 1,
            Shape::Two { rows, cols } => {
                let rows_ok = rows <= 1 || self.row_stride == 1;
                let cols_ok = cols <= 1 || self.col_stride == rows;
                rows_ok && cols_ok
            }
        }
    }

    #[inline]
    fn element_index(&self, row: usize, col: usize) -> usize {
        self.offset + row * self.row_stride + col * self.col_stride
    }

    /// Read one element; 1-D buffers use column 0
    pub fn get(&self, row: usize, col: usize) -> Result<Scalar> {
        if row >= self.shape.rows() {
            return Err(BasaltError::RowOutOfRange {
                position: row,
                count: self.shape.rows(),
            });
        }
        if col >= self.shape.cols() {
            return Err(BasaltError::ColumnOutOfRange {
                position: col,
                count: self.shape.cols(),
            });
        }
        Ok(self.storage.get(self.element_index(row, col)))
    }

    /// Iterate elements in column-major logical order
    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        let rows = self.shape.rows();
        let cols = self.shape.cols();
        (0..cols).flat_map(move |c| {
            (0..rows).map(move |r| self.storage.get(self.element_index(r, c)))
        })
    }

    /// Gather into a freshly allocated vector of scalars
    pub fn to_scalars(&self) -> Vec<Scalar> {
        self.iter().collect()
    }

    /// View of a contiguous row range; shares storage with `self`
    pub fn slice_rows(&self, range: Range<usize>) -> Result<Buffer> {
        let rows = self.shape.rows();
        if range.start > range.end || range.end > rows {
            return Err(BasaltError::RowOutOfRange {
                position: range.end,
                count: rows,
            });
        }
        let shape = match self.shape {
            Shape::One(_) => Shape::One(range.len()),
            Shape::Two { cols, .. } => Shape::Two {
                rows: range.len(),
                cols,
            },
        };
        Ok(Buffer {
            storage: Arc::clone(&self.storage),
            offset: self.offset + range.start * self.row_stride,
            shape,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
        })
    }

    /// View of a contiguous column range of a 2-D buffer
    pub fn slice_cols(&self, range: Range<usize>) -> Result<Buffer> {
        let rows = match self.shape {
            Shape::Two { rows, .. } => rows,
            Shape::One(n) => {
                return Err(BasaltError::ShapeMismatch {
                    expected: Shape::Two { rows: n, cols: 1 },
                    actual: self.shape,
                })
            }
        };
        let cols = self.shape.cols();
        if range.start > range.end || range.end > cols {
            return Err(BasaltError::ColumnOutOfRange {
                position: range.end,
                count: cols,
            });
        }
        Ok(Buffer {
            storage: Arc::clone(&self.storage),
            offset: self.offset + range.start * self.col_stride,
            shape: Shape::Two {
                rows,
                cols: range.len(),
            },
            row_stride: self.row_stride,
            col_stride: self.col_stride,
        })
    }

    /// 1-D view of one column of a 2-D buffer (or the buffer itself if 1-D
    /// and `col == 0`); shares storage with `self`
    pub fn column(&self, col: usize) -> Result<Buffer> {
        match self.shape {
            Shape::One(_) => {
                if col != 0 {
                    return Err(BasaltError::ColumnOutOfRange { position: col, count: 1 });
                }
                Ok(self.clone())
            }
            Shape::Two { rows, cols } => {
                if col >= cols {
                    return Err(BasaltError::ColumnOutOfRange {
                        position: col,
                        count: cols,
                    });
                }
                Ok(Buffer {
                    storage: Arc::clone(&self.storage),
                    offset: self.offset + col * self.col_stride,
                    shape: Shape::One(rows),
                    row_stride: self.row_stride,
                    col_stride: 0,
                })
            }
        }
    }

    /// Reinterpret a contiguous buffer under a new shape of equal length
    pub fn reshape(&self, shape: Shape) -> Result<Buffer> {
        if shape.len() != self.len() || !self.is_contiguous() {
            return Err(BasaltError::ShapeMismatch {
                expected: shape,
                actual: self.shape,
            });
        }
        let (row_stride, col_stride) = match shape {
            Shape::One(_) => (1, 0),
            Shape::Two { rows, .. } => (1, rows),
        };
        Ok(Buffer {
            storage: Arc::clone(&self.storage),
            offset: self.offset,
            shape,
            row_stride,
            col_stride,
        })
    }

    /// Swap axes of a 2-D buffer by swapping strides; 1-D is unchanged
    pub fn transpose(&self) -> Buffer {
        match self.shape {
            Shape::One(_) => self.clone(),
            Shape::Two { rows, cols } => Buffer {
                storage: Arc::clone(&self.storage),
                offset: self.offset,
                shape: Shape::Two {
                    rows: cols,
                    cols: rows,
                },
                row_stride: self.col_stride,
                col_stride: self.row_stride,
            },
        }
    }

    /// Copy into a new self-owning buffer of the given element type.
    ///
    /// Always allocates, including for the identity conversion; callers that
    /// want aliasing clone the buffer instead.
    pub fn astype(&self, dtype: DType) -> Result<Buffer> {
        if self.dtype().promote(dtype) != Some(dtype) {
            return Err(BasaltError::TypeMismatch {
                left: self.dtype(),
                right: dtype,
            });
        }
        let mut builder = BufferBuilder::with_capacity(dtype, self.len());
        for value in self.iter() {
            builder.push_promoting(value)?;
        }
        match self.shape {
            Shape::One(_) => Ok(builder.freeze()),
            Shape::Two { rows, cols } => builder.freeze_columns(rows, cols),
        }
    }

    /// Concatenate 1-D buffers into one new contiguous allocation.
    ///
    /// Element types are resolved through the promotion lattice. This always
    /// copies: concatenation merges disjoint storage regions, so aliasing is
    /// impossible at the buffer level. No-copy reuse of whole buffers
    /// side-by-side happens one level up, in the block manager.
    pub fn concat(parts: &[Buffer]) -> Result<Buffer> {
        let mut dtype = match parts.first() {
            Some(first) => first.dtype(),
            None => return Ok(Buffer::from_i64(Vec::new())),
        };
        let mut total = 0;
        for part in parts {
            if let Shape::Two { rows, cols } = part.shape() {
                return Err(BasaltError::ShapeMismatch {
                    expected: Shape::One(part.len()),
                    actual: Shape::Two { rows, cols },
                });
            }
            dtype = dtype.promote(part.dtype()).ok_or(BasaltError::TypeMismatch {
                left: dtype,
                right: part.dtype(),
            })?;
            total += part.len();
        }
        let mut builder = BufferBuilder::with_capacity(dtype, total);
        for part in parts {
            for value in part.iter() {
                builder.push_promoting(value)?;
            }
        }
        Ok(builder.freeze())
    }

    /// Contiguous typed slice access, when layout permits
    pub fn as_i64_slice(&self) -> Option<&[i64]> {
        if !self.is_contiguous() {
            return None;
        }
        match &self.storage.data {
            StorageData::Int64(v) => v.get(self.offset..self.offset + self.len()),
            _ => None,
        }
    }

    /// Contiguous typed slice access, when layout permits
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        if !self.is_contiguous() {
            return None;
        }
        match &self.storage.data {
            StorageData::Float64(v) => v.get(self.offset..self.offset + self.len()),
            _ => None,
        }
    }

    /// Zero-copy export descriptor; keeps the storage region alive
    pub fn export(&self) -> StorageHandle {
        StorageHandle {
            storage: Arc::clone(&self.storage),
            dtype: self.dtype(),
            shape: self.shape,
            offset: self.offset,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
        }
    }

    /// Boundary write entry point for foreign callers.
    ///
    /// A buffer is frozen from construction on, so this fails with
    /// [`BasaltError::Immutable`] unconditionally and never partially
    /// applies. It exists so that a write attempt expressed through the
    /// external surface gets the contractual rejection rather than a
    /// missing-method hole.
    pub fn try_set(&self, _row: usize, _col: usize, _value: Scalar) -> Result<()> {
        Err(BasaltError::Immutable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col_major_2d(values: &[i64], rows: usize, cols: usize) -> Buffer {
        let mut b = BufferBuilder::with_capacity(DType::Int64, values.len());
        for &v in values {
            b.push(Scalar::Int64(v)).unwrap();
        }
        b.freeze_columns(rows, cols).unwrap()
    }

    #[test]
    fn test_slice_shares_storage() {
        let buf = Buffer::from_i64(vec![0, 1, 2, 3, 4]);
        let view = buf.slice_rows(1..4).unwrap();
        assert!(view.shares_storage(&buf));
        assert_eq!(view.storage_id(), buf.storage_id());
        assert_eq!(view.to_scalars(), vec![1i64.into(), 2i64.into(), 3i64.into()]);
    }

    #[test]
    fn test_slice_out_of_range() {
        let buf = Buffer::from_i64(vec![0, 1, 2]);
        assert!(matches!(
            buf.slice_rows(1..5),
            Err(BasaltError::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_column_view_of_2d() {
        // columns: [0,1,2], [3,4,5]
        let buf = col_major_2d(&[0, 1, 2, 3, 4, 5], 3, 2);
        let col = buf.column(1).unwrap();
        assert!(col.shares_storage(&buf));
        assert_eq!(col.shape(), Shape::One(3));
        assert_eq!(col.get(2, 0).unwrap(), Scalar::Int64(5));
    }

    #[test]
    fn test_slice_cols_is_view() {
        let buf = col_major_2d(&[0, 1, 2, 3, 4, 5, 6, 7], 2, 4);
        let view = buf.slice_cols(1..3).unwrap();
        assert!(view.shares_storage(&buf));
        assert_eq!(view.shape(), Shape::Two { rows: 2, cols: 2 });
        assert_eq!(view.get(0, 0).unwrap(), Scalar::Int64(2));
        assert_eq!(view.get(1, 1).unwrap(), Scalar::Int64(5));
    }

    #[test]
    fn test_transpose_swaps_strides() {
        let buf = col_major_2d(&[0, 1, 2, 3, 4, 5], 3, 2);
        let t = buf.transpose();
        assert!(t.shares_storage(&buf));
        assert_eq!(t.shape(), Shape::Two { rows: 2, cols: 3 });
        assert_eq!(t.get(1, 2).unwrap(), buf.get(2, 1).unwrap());
    }

    #[test]
    fn test_reshape_requires_contiguity() {
        let buf = col_major_2d(&[0, 1, 2, 3, 4, 5], 3, 2);
        let flat = buf.reshape(Shape::One(6)).unwrap();
        assert!(flat.shares_storage(&buf));

        let strided = buf.transpose();
        assert!(matches!(
            strided.reshape(Shape::One(6)),
            Err(BasaltError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_astype_always_allocates() {
        let buf = Buffer::from_i64(vec![1, 2, 3]);
        let widened = buf.astype(DType::Float64).unwrap();
        assert!(!widened.shares_storage(&buf));
        assert_eq!(widened.get(1, 0).unwrap(), Scalar::Float64(2.0));

        let same = buf.astype(DType::Int64).unwrap();
        assert!(!same.shares_storage(&buf));

        assert!(matches!(
            buf.astype(DType::Bool),
            Err(BasaltError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_promotes_and_copies() {
        let a = Buffer::from_i64(vec![1, 2]);
        let b = Buffer::from_f64(vec![0.5]);
        let out = Buffer::concat(&[a.clone(), b]).unwrap();
        assert_eq!(out.dtype(), DType::Float64);
        assert!(!out.shares_storage(&a));
        assert_eq!(
            out.to_scalars(),
            vec![1.0f64.into(), 2.0f64.into(), 0.5f64.into()]
        );
    }

    #[test]
    fn test_concat_rejects_unpromotable() {
        let a = Buffer::from_i64(vec![1]);
        let b = Buffer::from_str_values(["x"]);
        assert!(matches!(
            Buffer::concat(&[a, b]),
            Err(BasaltError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mutation_rejected_and_data_unchanged() {
        let buf = Buffer::from_i64(vec![7, 8, 9]);
        let before = buf.to_scalars();
        assert!(matches!(
            buf.try_set(0, 0, Scalar::Int64(0)),
            Err(BasaltError::Immutable)
        ));
        assert_eq!(buf.to_scalars(), before);
    }

    #[test]
    fn test_export_keeps_storage_alive() {
        let handle = {
            let buf = Buffer::from_i64(vec![1, 2, 3]);
            buf.export()
            // `buf` dropped here; the handle must still read valid data
        };
        assert_eq!(handle.dtype(), DType::Int64);
        assert_eq!(handle.int64_data().unwrap(), &[1, 2, 3]);
        assert_eq!(handle.strides(), (1, 0));
    }

    #[test]
    fn test_export_describes_view_position() {
        let buf = col_major_2d(&[0, 1, 2, 3, 4, 5], 3, 2);
        let col = buf.column(1).unwrap();
        let handle = col.export();
        assert_eq!(handle.offset(), 3);
        assert_eq!(handle.storage_id(), buf.storage_id());
    }
}
