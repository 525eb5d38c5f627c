//! Immutable axis indices: unique labels mapped to positions
//!
//! An [`Index`] is an ordered sequence of unique labels plus a
//! label-to-position hash map. It is built once and never mutated; renaming
//! shares the label storage and the map through an `Arc`, which is what
//! makes axis renaming free. Labels are either scalars or tuples of scalars
//! (multi-level).

mod label;

pub use label::Label;

use crate::buffer::Buffer;
use crate::data::Scalar;
use crate::{BasaltError, Result};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

/// Backing representation of the label sequence
#[derive(Debug)]
enum Labels {
    /// Auto-incrementing integers 0..n; positions are computed, not mapped
    Auto(usize),
    /// Labels read directly out of a 1-D buffer, possibly a column view
    Buffer(Buffer),
    /// Materialized labels: multi-level, or mixed-type set-operation results
    List(Arc<[Label]>),
}

#[derive(Debug)]
struct IndexInner {
    labels: Labels,
    /// Empty for `Labels::Auto`; positions are arithmetic there
    map: AHashMap<Label, usize>,
}

/// Immutable ordered mapping from unique label to integer position
#[derive(Debug, Clone)]
pub struct Index {
    inner: Arc<IndexInner>,
    name: Option<Arc<str>>,
}

/// Result of an index set operation: the combined index plus, per input, a
/// mapping from input position to result position (`None` when the input
/// label is absent from the result)
#[derive(Debug)]
pub struct IndexSetOp {
    pub index: Index,
    pub left_map: Vec<Option<usize>>,
    pub right_map: Vec<Option<usize>>,
}

/// Process-wide memoized auto-range indices, keyed by length. The cached
/// values are immutable and cheap to clone; the lock guards only the map.
static AUTO_CACHE: Lazy<RwLock<AHashMap<usize, Index>>> =
    Lazy::new(|| RwLock::new(AHashMap::new()));

const AUTO_CACHE_CAP: usize = 512;

fn build_map<I>(labels: I) -> Result<AHashMap<Label, usize>>
where
    I: IntoIterator<Item = Label>,
{
    let mut map = AHashMap::new();
    for (pos, label) in labels.into_iter().enumerate() {
        if map.insert(label.clone(), pos).is_some() {
            return Err(BasaltError::DuplicateLabel(label.to_string()));
        }
    }
    Ok(map)
}

impl Index {
    /// Build from owned scalar labels; fails on any duplicate
    pub fn from_labels<I>(labels: I) -> Result<Index>
    where
        I: IntoIterator<Item = Scalar>,
    {
        let labels: Vec<Scalar> = labels.into_iter().collect();
        // Uniform-typed labels live in a buffer so later derivations can
        // share their storage; mixed labels fall back to a materialized list.
        let uniform = labels.windows(2).all(|w| w[0].dtype() == w[1].dtype());
        if uniform && !labels.is_empty() {
            let dtype = labels[0].dtype();
            let mut builder = crate::buffer::BufferBuilder::with_capacity(dtype, labels.len());
            for label in labels {
                builder.push(label)?;
            }
            Index::from_buffer(builder.freeze())
        } else {
            let labels: Vec<Label> = labels.into_iter().map(Label::Scalar).collect();
            let map = build_map(labels.iter().cloned())?;
            Ok(Index {
                inner: Arc::new(IndexInner {
                    labels: Labels::List(labels.into()),
                    map,
                }),
                name: None,
            })
        }
    }

    /// Build directly over a 1-D buffer without copying its elements.
    ///
    /// This is the promotion path: a column becomes a row index while its
    /// storage stays exactly where it is.
    pub fn from_buffer(buffer: Buffer) -> Result<Index> {
        if buffer.col_count() != 1 {
            return Err(BasaltError::ShapeMismatch {
                expected: crate::buffer::Shape::One(buffer.len()),
                actual: buffer.shape(),
            });
        }
        let map = build_map(buffer.iter().map(Label::Scalar))?;
        Ok(Index {
            inner: Arc::new(IndexInner {
                labels: Labels::Buffer(buffer),
                map,
            }),
            name: None,
        })
    }

    /// Build a multi-level index from equal-length label buffers; each
    /// resulting label is the tuple of per-level values at one position
    pub fn from_levels(levels: &[Buffer]) -> Result<Index> {
        let len = match levels.first() {
            Some(first) => first.row_count(),
            None => 0,
        };
        for level in levels {
            if level.col_count() != 1 || level.row_count() != len {
                return Err(BasaltError::ShapeMismatch {
                    expected: crate::buffer::Shape::One(len),
                    actual: level.shape(),
                });
            }
        }
        let mut labels = Vec::with_capacity(len);
        for pos in 0..len {
            let tuple: Vec<Scalar> = levels
                .iter()
                .map(|level| level.get(pos, 0))
                .collect::<Result<_>>()?;
            labels.push(Label::Tuple(tuple.into()));
        }
        let map = build_map(labels.iter().cloned())?;
        Ok(Index {
            inner: Arc::new(IndexInner {
                labels: Labels::List(labels.into()),
                map,
            }),
            name: None,
        })
    }

    /// Build from pre-formed labels (scalar or tuple); fails on duplicates
    pub(crate) fn from_label_list(labels: Vec<Label>) -> Result<Index> {
        let map = build_map(labels.iter().cloned())?;
        Ok(Index {
            inner: Arc::new(IndexInner {
                labels: Labels::List(labels.into()),
                map,
            }),
            name: None,
        })
    }

    /// Auto-incrementing integer index 0..len, memoized process-wide
    pub fn auto(len: usize) -> Index {
        if let Some(cached) = AUTO_CACHE.read().get(&len) {
            return cached.clone();
        }
        let index = Index {
            inner: Arc::new(IndexInner {
                labels: Labels::Auto(len),
                map: AHashMap::new(),
            }),
            name: None,
        };
        let mut cache = AUTO_CACHE.write();
        if let Some(cached) = cache.get(&len) {
            return cached.clone();
        }
        if cache.len() < AUTO_CACHE_CAP {
            cache.insert(len, index.clone());
        }
        index
    }

    pub fn len(&self) -> usize {
        match &self.inner.labels {
            Labels::Auto(n) => *n,
            Labels::Buffer(b) => b.row_count(),
            Labels::List(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether this is an auto-incrementing positional index
    pub fn is_auto(&self) -> bool {
        matches!(self.inner.labels, Labels::Auto(_))
    }

    /// Index over a contiguous label range. Buffer-backed labels are sliced
    /// as views (storage shared); only the position map is rebuilt.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Result<Index> {
        if range.start > range.end || range.end > self.len() {
            return Err(BasaltError::RowOutOfRange {
                position: range.end,
                count: self.len(),
            });
        }
        let sliced = match &self.inner.labels {
            Labels::Auto(_) if range.start == 0 => Index::auto(range.len()),
            Labels::Auto(_) => Index::from_labels(
                range.clone().map(|v| Scalar::Int64(v as i64)),
            )?,
            Labels::Buffer(b) => Index::from_buffer(b.slice_rows(range.clone())?)?,
            Labels::List(l) => Index::from_label_list(l[range.clone()].to_vec())?,
        };
        Ok(Index {
            inner: sliced.inner,
            name: self.name.clone(),
        })
    }

    /// New index with a different axis name; labels and map are shared, so
    /// this is a constant-time metadata change
    pub fn rename(&self, name: impl Into<Arc<str>>) -> Index {
        Index {
            inner: Arc::clone(&self.inner),
            name: Some(name.into()),
        }
    }

    /// New index with the same positions carrying new labels; only the label
    /// array is replaced, no buffer of the caller is touched
    pub fn relabel<I>(&self, labels: I) -> Result<Index>
    where
        I: IntoIterator<Item = Scalar>,
    {
        let replacement = Index::from_labels(labels)?;
        if replacement.len() != self.len() {
            return Err(BasaltError::ShapeMismatch {
                expected: crate::buffer::Shape::One(self.len()),
                actual: crate::buffer::Shape::One(replacement.len()),
            });
        }
        Ok(Index {
            inner: replacement.inner,
            name: self.name.clone(),
        })
    }

    /// Average O(1) label lookup
    pub fn position_of(&self, label: &Label) -> Option<usize> {
        match &self.inner.labels {
            Labels::Auto(n) => match label {
                Label::Scalar(Scalar::Int64(v)) if *v >= 0 && (*v as usize) < *n => {
                    Some(*v as usize)
                }
                _ => None,
            },
            _ => self.inner.map.get(label).copied(),
        }
    }

    pub fn position_of_scalar(&self, label: &Scalar) -> Option<usize> {
        self.position_of(&Label::Scalar(label.clone()))
    }

    pub fn label_at(&self, position: usize) -> Option<Label> {
        if position >= self.len() {
            return None;
        }
        match &self.inner.labels {
            Labels::Auto(_) => Some(Label::Scalar(Scalar::Int64(position as i64))),
            Labels::Buffer(b) => b.get(position, 0).ok().map(Label::Scalar),
            Labels::List(l) => Some(l[position].clone()),
        }
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.position_of(label).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = Label> + '_ {
        (0..self.len()).filter_map(move |pos| self.label_at(pos))
    }

    /// Identity of the label storage when buffer-backed (used by no-copy
    /// assertions for promoted columns)
    pub fn label_storage_id(&self) -> Option<usize> {
        match &self.inner.labels {
            Labels::Buffer(b) => Some(b.storage_id()),
            _ => None,
        }
    }

    /// Whether two indices hold the same labels in the same order.
    /// Shared internals short-circuit to true without comparing labels.
    pub fn equals(&self, other: &Index) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        if let (Labels::Buffer(a), Labels::Buffer(b)) = (&self.inner.labels, &other.inner.labels) {
            if a.shares_storage(b) && a.strides() == b.strides() && a.offset() == b.offset() {
                return true;
            }
        }
        self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }

    /// Union preserving self's order, then other's unseen labels in order
    pub fn union(&self, other: &Index) -> IndexSetOp {
        let mut labels: Vec<Label> = self.iter().collect();
        let mut map: AHashMap<Label, usize> = labels
            .iter()
            .cloned()
            .enumerate()
            .map(|(pos, label)| (label, pos))
            .collect();
        let left_map: Vec<Option<usize>> = (0..labels.len()).map(Some).collect();
        let mut right_map = Vec::with_capacity(other.len());
        for label in other.iter() {
            if let Some(&pos) = map.get(&label) {
                right_map.push(Some(pos));
            } else {
                let pos = labels.len();
                map.insert(label.clone(), pos);
                labels.push(label);
                right_map.push(Some(pos));
            }
        }
        let index = Index {
            inner: Arc::new(IndexInner {
                labels: Labels::List(labels.into()),
                map,
            }),
            name: None,
        };
        IndexSetOp {
            index,
            left_map,
            right_map,
        }
    }

    /// Intersection preserving self's order
    pub fn intersection(&self, other: &Index) -> IndexSetOp {
        let mut labels = Vec::new();
        let mut map = AHashMap::new();
        let mut left_map = Vec::with_capacity(self.len());
        for label in self.iter() {
            if other.contains(&label) {
                let pos = labels.len();
                map.insert(label.clone(), pos);
                labels.push(label);
                left_map.push(Some(pos));
            } else {
                left_map.push(None);
            }
        }
        let right_map: Vec<Option<usize>> = other
            .iter()
            .map(|label| map.get(&label).copied())
            .collect();
        let index = Index {
            inner: Arc::new(IndexInner {
                labels: Labels::List(labels.into()),
                map,
            }),
            name: None,
        };
        IndexSetOp {
            index,
            left_map,
            right_map,
        }
    }

    /// Concatenate label sequences into a new index; duplicate labels across
    /// the inputs fail, matching vertical table concatenation semantics
    pub fn concat(parts: &[&Index]) -> Result<Index> {
        let labels: Vec<Label> = parts.iter().flat_map(|p| p.iter()).collect();
        let map = build_map(labels.iter().cloned())?;
        Ok(Index {
            inner: Arc::new(IndexInner {
                labels: Labels::List(labels.into()),
                map,
            }),
            name: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_index(values: &[i64]) -> Index {
        Index::from_labels(values.iter().map(|&v| Scalar::Int64(v))).unwrap()
    }

    #[test]
    fn test_build_and_lookup() {
        let idx = int_index(&[10, 20, 30]);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.position_of_scalar(&Scalar::Int64(20)), Some(1));
        assert_eq!(idx.position_of_scalar(&Scalar::Int64(99)), None);
        assert_eq!(idx.label_at(2), Some(Label::Scalar(Scalar::Int64(30))));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let err = Index::from_labels([Scalar::Int64(1), Scalar::Int64(1)]).unwrap_err();
        assert!(matches!(err, BasaltError::DuplicateLabel(_)));
    }

    #[test]
    fn test_rename_shares_internals() {
        let idx = int_index(&[1, 2, 3]);
        let renamed = idx.rename("foo");
        assert_eq!(renamed.name(), Some("foo"));
        assert!(Arc::ptr_eq(&idx.inner, &renamed.inner));
        assert!(idx.equals(&renamed));
    }

    #[test]
    fn test_relabel_keeps_positions_and_name() {
        let idx = int_index(&[1, 2, 3]).rename("r");
        let relabeled = idx.relabel(["a", "b", "c"].map(Scalar::from)).unwrap();
        assert_eq!(relabeled.name(), Some("r"));
        assert_eq!(relabeled.position_of_scalar(&Scalar::from("b")), Some(1));

        let err = idx.relabel([Scalar::Int64(9)]).unwrap_err();
        assert!(matches!(err, BasaltError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_from_buffer_shares_storage() {
        let buf = Buffer::from_i64(vec![0, 4, 8]);
        let idx = Index::from_buffer(buf.clone()).unwrap();
        assert_eq!(idx.label_storage_id(), Some(buf.storage_id()));
        assert_eq!(idx.position_of_scalar(&Scalar::Int64(4)), Some(1));
    }

    #[test]
    fn test_auto_index_is_memoized() {
        let a = Index::auto(17);
        let b = Index::auto(17);
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a.position_of_scalar(&Scalar::Int64(16)), Some(16));
        assert_eq!(a.position_of_scalar(&Scalar::Int64(17)), None);
        assert_eq!(a.label_at(3), Some(Label::Scalar(Scalar::Int64(3))));
    }

    #[test]
    fn test_multi_level_lookup() {
        let level0 = Buffer::from_str_values(["a", "a", "b"]);
        let level1 = Buffer::from_i64(vec![1, 2, 1]);
        let idx = Index::from_levels(&[level0, level1]).unwrap();
        let key = Label::Tuple(vec![Scalar::from("a"), Scalar::Int64(2)].into());
        assert_eq!(idx.position_of(&key), Some(1));
    }

    #[test]
    fn test_multi_level_duplicates_rejected() {
        let level0 = Buffer::from_str_values(["a", "a"]);
        let level1 = Buffer::from_i64(vec![1, 1]);
        assert!(matches!(
            Index::from_levels(&[level0, level1]),
            Err(BasaltError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn test_union_and_remaps() {
        let left = int_index(&[1, 2, 3]);
        let right = int_index(&[3, 4]);
        let op = left.union(&right);
        assert_eq!(op.index.len(), 4);
        assert_eq!(op.left_map, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(op.right_map, vec![Some(2), Some(3)]);
        assert_eq!(op.index.position_of_scalar(&Scalar::Int64(4)), Some(3));
    }

    #[test]
    fn test_intersection_and_remaps() {
        let left = int_index(&[1, 2, 3]);
        let right = int_index(&[3, 1]);
        let op = left.intersection(&right);
        assert_eq!(op.index.len(), 2);
        assert_eq!(op.left_map, vec![Some(0), None, Some(1)]);
        assert_eq!(op.right_map, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_concat_rejects_collisions() {
        let a = int_index(&[1, 2]);
        let b = int_index(&[2, 3]);
        assert!(matches!(
            Index::concat(&[&a, &b]),
            Err(BasaltError::DuplicateLabel(_))
        ));
        let c = int_index(&[3, 4]);
        let joined = Index::concat(&[&a, &c]).unwrap();
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.position_of_scalar(&Scalar::Int64(3)), Some(2));
    }

    #[test]
    fn test_slice_shares_label_storage() {
        let buf = Buffer::from_i64(vec![10, 20, 30, 40]);
        let idx = Index::from_buffer(buf.clone()).unwrap().rename("r");
        let sliced = idx.slice(1..3).unwrap();
        assert_eq!(sliced.name(), Some("r"));
        assert_eq!(sliced.label_storage_id(), Some(buf.storage_id()));
        assert_eq!(sliced.position_of_scalar(&Scalar::Int64(30)), Some(1));
        assert_eq!(sliced.position_of_scalar(&Scalar::Int64(10)), None);
    }

    #[test]
    fn test_slice_of_auto_index() {
        let idx = Index::auto(5);
        let head = idx.slice(0..3).unwrap();
        assert!(head.is_auto());
        let tail = idx.slice(2..5).unwrap();
        assert!(!tail.is_auto());
        assert_eq!(tail.label_at(0), Some(Label::Scalar(Scalar::Int64(2))));
    }

    #[test]
    fn test_equals_is_order_sensitive() {
        let a = int_index(&[1, 2, 3]);
        let b = int_index(&[3, 2, 1]);
        assert!(!a.equals(&b));
        let c = int_index(&[1, 2, 3]);
        assert!(a.equals(&c));
    }
}
