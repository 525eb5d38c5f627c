//! Data type vocabulary: element type tags, scalar values, promotion

mod dtype;
mod scalar;

pub use dtype::DType;
pub use scalar::Scalar;
