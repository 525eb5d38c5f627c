//! Index labels: single scalars or multi-level tuples

use crate::data::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One axis label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Scalar(Scalar),
    /// Multi-level label: one scalar per level
    Tuple(Arc<[Scalar]>),
}

impl Label {
    /// Number of levels (1 for scalar labels)
    pub fn depth(&self) -> usize {
        match self {
            Label::Scalar(_) => 1,
            Label::Tuple(t) => t.len(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Label::Scalar(s) => Some(s),
            Label::Tuple(_) => None,
        }
    }

    /// Value at one level
    pub fn level(&self, depth: usize) -> Option<&Scalar> {
        match self {
            Label::Scalar(s) if depth == 0 => Some(s),
            Label::Scalar(_) => None,
            Label::Tuple(t) => t.get(depth),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Scalar(s) => write!(f, "{s}"),
            Label::Tuple(t) => {
                f.write_str("(")?;
                for (i, s) in t.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{s}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Scalar> for Label {
    fn from(s: Scalar) -> Self {
        Label::Scalar(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_and_levels() {
        let single = Label::Scalar(Scalar::Int64(1));
        assert_eq!(single.depth(), 1);
        assert_eq!(single.level(0), Some(&Scalar::Int64(1)));
        assert_eq!(single.level(1), None);

        let tuple = Label::Tuple(vec![Scalar::from("a"), Scalar::Int64(2)].into());
        assert_eq!(tuple.depth(), 2);
        assert_eq!(tuple.level(1), Some(&Scalar::Int64(2)));
        assert_eq!(tuple.as_scalar(), None);
    }

    #[test]
    fn test_display() {
        let tuple = Label::Tuple(vec![Scalar::from("a"), Scalar::Int64(2)].into());
        assert_eq!(tuple.to_string(), "(a, 2)");
    }
}
