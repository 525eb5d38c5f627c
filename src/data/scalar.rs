//! Scalar values with total ordering, equality and hashing
//!
//! Index labels are hashed and compared, so `Scalar` carries a total `Eq`,
//! `Ord` and `Hash`: NaN equals NaN, floats hash by bit pattern, and
//! cross-type comparison falls back to a type-rank ordering.

use super::DType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A single element value of any supported type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Str(Arc<str>),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Bool(_) => DType::Bool,
            Scalar::Int64(_) => DType::Int64,
            Scalar::Float64(_) => DType::Float64,
            Scalar::Str(_) => DType::Str,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Convert this value to the given type along the promotion lattice.
    ///
    /// Returns `None` when no promotion is defined (e.g. numeric to `Str`).
    pub fn cast(&self, dtype: DType) -> Option<Scalar> {
        if self.dtype() == dtype {
            return Some(self.clone());
        }
        match (self, dtype) {
            (Scalar::Bool(v), DType::Int64) => Some(Scalar::Int64(*v as i64)),
            (Scalar::Bool(v), DType::Float64) => Some(Scalar::Float64(*v as i64 as f64)),
            (Scalar::Int64(v), DType::Float64) => Some(Scalar::Float64(*v as f64)),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Int64(_) => 1,
            Scalar::Float64(_) => 2,
            Scalar::Str(_) => 3,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int64(a), Scalar::Int64(b)) => a == b,
            // NaN == NaN, so labels containing NaN stay unique-checkable
            (Scalar::Float64(a), Scalar::Float64(b)) => a.to_bits() == b.to_bits() || a == b,
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Bool(v) => v.hash(state),
            Scalar::Int64(v) => v.hash(state),
            Scalar::Float64(v) => v.to_bits().hash(state),
            Scalar::Str(v) => v.hash(state),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Int64(a), Scalar::Int64(b)) => a.cmp(b),
            (Scalar::Float64(a), Scalar::Float64(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float64(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(Arc::from(v))
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(Arc::from(v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(s: &Scalar) -> u64 {
        let mut h = DefaultHasher::new();
        s.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_dtype_and_accessors() {
        assert_eq!(Scalar::Int64(3).dtype(), DType::Int64);
        assert_eq!(Scalar::Int64(3).as_i64(), Some(3));
        assert_eq!(Scalar::from("a").as_str(), Some("a"));
        assert_eq!(Scalar::Bool(true).as_i64(), None);
    }

    #[test]
    fn test_nan_is_self_equal_and_hashable() {
        let a = Scalar::Float64(f64::NAN);
        let b = Scalar::Float64(f64::NAN);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_cross_type_inequality() {
        assert_ne!(Scalar::Int64(1), Scalar::Float64(1.0));
        assert_ne!(Scalar::Bool(true), Scalar::Int64(1));
    }

    #[test]
    fn test_cast_along_lattice() {
        assert_eq!(Scalar::Bool(true).cast(DType::Int64), Some(Scalar::Int64(1)));
        assert_eq!(Scalar::Int64(2).cast(DType::Float64), Some(Scalar::Float64(2.0)));
        assert_eq!(Scalar::Int64(2).cast(DType::Str), None);
    }

    #[test]
    fn test_total_ordering() {
        assert!(Scalar::Int64(1) < Scalar::Int64(2));
        assert!(Scalar::Float64(1.0) < Scalar::Float64(f64::NAN));
        assert!(Scalar::Bool(true) < Scalar::Int64(0));
    }
}
