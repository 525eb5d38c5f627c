//! Element type tags and the type promotion lattice

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a buffer or scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DType {
    Bool,
    Int64,
    Float64,
    Str,
}

impl DType {
    /// Fixed element size in bytes (0 for variable-length types)
    pub fn fixed_size(&self) -> usize {
        match self {
            DType::Bool => 1,
            DType::Int64 | DType::Float64 => 8,
            DType::Str => 0,
        }
    }

    pub fn is_variable_length(&self) -> bool {
        matches!(self, DType::Str)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Bool | DType::Int64 | DType::Float64)
    }

    /// Resolve the common type of two element types.
    ///
    /// Equal types resolve to themselves; `Bool` widens to `Int64`, any
    /// numeric pair widens to `Float64`. `Str` combined with a numeric type
    /// has no common type and returns `None` (callers map that to
    /// `TypeMismatch`). Combining across types always implies a copy.
    pub fn promote(self, other: DType) -> Option<DType> {
        if self == other {
            return Some(self);
        }
        match (self, other) {
            (DType::Bool, DType::Int64) | (DType::Int64, DType::Bool) => Some(DType::Int64),
            (DType::Bool, DType::Float64) | (DType::Float64, DType::Bool) => Some(DType::Float64),
            (DType::Int64, DType::Float64) | (DType::Float64, DType::Int64) => Some(DType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::Int64 => "int64",
            DType::Float64 => "float64",
            DType::Str => "str",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_reflexive() {
        for dt in [DType::Bool, DType::Int64, DType::Float64, DType::Str] {
            assert_eq!(dt.promote(dt), Some(dt));
        }
    }

    #[test]
    fn test_promote_widening() {
        assert_eq!(DType::Bool.promote(DType::Int64), Some(DType::Int64));
        assert_eq!(DType::Int64.promote(DType::Float64), Some(DType::Float64));
        assert_eq!(DType::Float64.promote(DType::Bool), Some(DType::Float64));
    }

    #[test]
    fn test_promote_str_is_isolated() {
        assert_eq!(DType::Str.promote(DType::Int64), None);
        assert_eq!(DType::Bool.promote(DType::Str), None);
        assert_eq!(DType::Str.promote(DType::Str), Some(DType::Str));
    }
}
