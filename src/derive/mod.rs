//! The derivation engine: the no-copy / copy-fallback algebra
//!
//! Every derivation in the crate goes one of two ways: the result aliases
//! existing storage (a view), or a fallback allocates. [`Derived`] carries
//! that outcome as result metadata so callers and tests can assert exactly
//! when a conceptually no-copy-eligible operation allocated. Allocation is
//! never silent: the copying paths here log at debug level.

use crate::buffer::Buffer;
use crate::data::DType;
use crate::{BasaltError, Result};
use log::debug;

/// A derivation result plus its copy-fallback notice.
///
/// `copied == false` means the value aliases storage that existed before the
/// operation; `copied == true` means at least one new region was allocated.
#[derive(Debug, Clone)]
pub struct Derived<T> {
    value: T,
    copied: bool,
}

impl<T> Derived<T> {
    /// A result that aliases pre-existing storage
    pub fn view(value: T) -> Self {
        Self {
            value,
            copied: false,
        }
    }

    /// A result that required allocation
    pub fn copied(value: T) -> Self {
        Self {
            value,
            copied: true,
        }
    }

    /// The copy-fallback notice: whether this derivation allocated
    pub fn was_copied(&self) -> bool {
        self.copied
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Wrap a derived component into a larger value, keeping the notice
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Derived<U> {
        Derived {
            value: f(self.value),
            copied: self.copied,
        }
    }

    /// Combine with another derivation; the notice is sticky
    pub fn join<U, V>(self, other: Derived<U>, f: impl FnOnce(T, U) -> V) -> Derived<V> {
        Derived {
            value: f(self.value, other.value),
            copied: self.copied || other.copied,
        }
    }
}

impl<T> Derived<Result<T>> {
    /// Hoist an inner failure out of the derivation, keeping the notice
    pub fn into_result(self) -> Result<Derived<T>> {
        let copied = self.copied;
        self.value.map(|value| Derived { value, copied })
    }
}

/// Fold the promotion lattice over a sequence of element types
pub fn resolve_dtypes<I>(dtypes: I) -> Result<Option<DType>>
where
    I: IntoIterator<Item = DType>,
{
    let mut resolved: Option<DType> = None;
    for dtype in dtypes {
        resolved = Some(match resolved {
            None => dtype,
            Some(current) => current.promote(dtype).ok_or(BasaltError::TypeMismatch {
                left: current,
                right: dtype,
            })?,
        });
    }
    Ok(resolved)
}

/// Combine 1-D column parts into one column buffer.
///
/// A single part passes through as a view; anything else is a copy fallback
/// (disjoint regions must merge into one contiguous region), flagged and
/// logged so performance-sensitive callers can see it.
pub fn concat_column(parts: &[Buffer]) -> Result<Derived<Buffer>> {
    if parts.len() == 1 {
        return Ok(Derived::view(parts[0].clone()));
    }
    let dtype = resolve_dtypes(parts.iter().map(|p| p.dtype()))?;
    let total: usize = parts.iter().map(|p| p.len()).sum();
    debug!(
        "copy fallback: concatenating {} column parts ({} elements, dtype {:?})",
        parts.len(),
        total,
        dtype
    );
    Ok(Derived::copied(Buffer::concat(parts)?))
}

/// Convert a buffer to a target element type; always a copy by necessity
pub fn cast_buffer(buffer: &Buffer, dtype: DType) -> Result<Derived<Buffer>> {
    debug!(
        "copy fallback: casting {} elements from {} to {}",
        buffer.len(),
        buffer.dtype(),
        dtype
    );
    Ok(Derived::copied(buffer.astype(dtype)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Scalar;

    #[test]
    fn test_notice_is_sticky_through_join() {
        let a = Derived::view(1);
        let b = Derived::copied(2);
        let joined = a.join(b, |x, y| x + y);
        assert_eq!(*joined.value(), 3);
        assert!(joined.was_copied());

        let c = Derived::view(1).join(Derived::view(2), |x, y| x + y);
        assert!(!c.was_copied());
    }

    #[test]
    fn test_resolve_dtypes() {
        assert_eq!(
            resolve_dtypes([DType::Bool, DType::Int64, DType::Float64]).unwrap(),
            Some(DType::Float64)
        );
        assert_eq!(resolve_dtypes([]).unwrap(), None);
        assert!(matches!(
            resolve_dtypes([DType::Int64, DType::Str]),
            Err(BasaltError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_single_part_concat_is_a_view() {
        let col = Buffer::from_i64(vec![1, 2, 3]);
        let derived = concat_column(std::slice::from_ref(&col)).unwrap();
        assert!(!derived.was_copied());
        assert!(derived.value().shares_storage(&col));
    }

    #[test]
    fn test_multi_part_concat_is_flagged() {
        let a = Buffer::from_i64(vec![1]);
        let b = Buffer::from_i64(vec![2]);
        let derived = concat_column(&[a, b]).unwrap();
        assert!(derived.was_copied());
        assert_eq!(
            derived.value().to_scalars(),
            vec![Scalar::Int64(1), Scalar::Int64(2)]
        );
    }

    #[test]
    fn test_cast_is_always_flagged() {
        let col = Buffer::from_i64(vec![1, 2]);
        let derived = cast_buffer(&col, DType::Int64).unwrap();
        assert!(derived.was_copied());
        assert!(!derived.value().shares_storage(&col));
    }
}
