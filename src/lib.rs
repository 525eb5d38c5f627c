//! Basalt: immutable columnar in-memory table engine
//!
//! Tables, indices and buffers are frozen at construction and derive new
//! values from old ones without copying the underlying storage wherever the
//! derivation algebra allows: slicing, column selection, axis renaming,
//! promoting a column to the row index, and aligned horizontal
//! concatenation are all views. Operations that must allocate (type
//! coercion, vertical concatenation, consolidation) say so through an
//! explicit copy-fallback notice.
//!
//! Because no write path to published data exists, any number of threads
//! may hold and traverse the same table concurrently without locking;
//! storage lifetime is shared-ownership reference counting.

pub mod blocks;
pub mod buffer;
pub mod data;
pub mod derive;
pub mod index;
pub mod table;

// Re-export main types
pub use blocks::{Block, BlockManager};
pub use buffer::{Buffer, BufferBuilder, Shape, Storage, StorageHandle};
pub use data::{DType, Scalar};
pub use derive::Derived;
pub use index::{Index, IndexSetOp, Label};
pub use table::{Axis, Table};

/// Engine error type.
///
/// These are programming-contract violations, surfaced synchronously at the
/// violating call; constructors are atomic, so a failure leaves nothing
/// observable behind. None of them are transient, and no retry logic exists.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BasaltError {
    #[error("attempted write to published immutable data")]
    Immutable,

    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    #[error("axis alignment: {0}")]
    AxisAlignment(String),

    #[error("no common type for {left} and {right}")]
    TypeMismatch { left: DType, right: DType },

    #[error("column position {position} out of range (column count {count})")]
    ColumnOutOfRange { position: usize, count: usize },

    #[error("row position {position} out of range (row count {count})")]
    RowOutOfRange { position: usize, count: usize },

    #[error("label not found: {0}")]
    LabelNotFound(String),
}

pub type Result<T> = std::result::Result<T, BasaltError>;
