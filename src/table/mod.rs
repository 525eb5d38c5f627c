//! The table: row index, column index and block manager composed
//!
//! A [`Table`] is never edited; every operation assembles a new table that
//! shares as much storage with its source as the derivation algebra allows.
//! Operations that can fall back to a copy return [`Derived`] so the notice
//! is visible to callers.

use crate::blocks::BlockManager;
use crate::buffer::{Buffer, Shape};
use crate::data::Scalar;
use crate::derive::Derived;
use crate::index::{Index, Label};
use crate::{BasaltError, Result};
use serde::{Deserialize, Serialize};


/// Table axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Rows,
    Columns,
}

/// Immutable two-dimensional labelled table
#[derive(Debug, Clone)]
pub struct Table {
    rows: Index,
    columns: Index,
    blocks: BlockManager,
}

impl Table {
    /// Compose from parts, enforcing the length invariants: the row index
    /// must match every block's row count, the column index the total
    /// logical column count.
    pub fn new(rows: Index, columns: Index, blocks: BlockManager) -> Result<Table> {
        if rows.len() != blocks.row_count() {
            return Err(BasaltError::ShapeMismatch {
                expected: Shape::One(blocks.row_count()),
                actual: Shape::One(rows.len()),
            });
        }
        if columns.len() != blocks.col_count() {
            return Err(BasaltError::ShapeMismatch {
                expected: Shape::One(blocks.col_count()),
                actual: Shape::One(columns.len()),
            });
        }
        Ok(Table {
            rows,
            columns,
            blocks,
        })
    }

    /// Ingest labelled column buffers under an auto-incrementing row index
    pub fn from_columns<I>(columns: I) -> Result<Table>
    where
        I: IntoIterator<Item = (Scalar, Buffer)>,
    {
        let (labels, buffers): (Vec<Scalar>, Vec<Buffer>) = columns.into_iter().unzip();
        let blocks = BlockManager::from_buffers(buffers)?;
        let rows = Index::auto(blocks.row_count());
        let columns = Index::from_labels(labels)?;
        Table::new(rows, columns, blocks)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.blocks.row_count(), self.blocks.col_count())
    }

    pub fn row_index(&self) -> &Index {
        &self.rows
    }

    pub fn column_index(&self) -> &Index {
        &self.columns
    }

    pub fn blocks(&self) -> &BlockManager {
        &self.blocks
    }

    /// Read one element by position
    pub fn get(&self, row: usize, col: usize) -> Result<Scalar> {
        self.blocks.get(row, col)
    }

    /// 1-D view of one column; shares block storage
    pub fn column_view(&self, col: usize) -> Result<Buffer> {
        self.blocks.column_view(col)
    }

    /// 1-D view of the column carrying the given label
    pub fn column_by_label(&self, label: &Scalar) -> Result<Buffer> {
        let pos = self
            .columns
            .position_of_scalar(label)
            .ok_or_else(|| BasaltError::LabelNotFound(label.to_string()))?;
        self.blocks.column_view(pos)
    }

    /// Rename one axis; index internals and blocks are shared, O(1)
    pub fn rename_axis(&self, axis: Axis, name: impl Into<std::sync::Arc<str>>) -> Table {
        match axis {
            Axis::Rows => Table {
                rows: self.rows.rename(name),
                columns: self.columns.clone(),
                blocks: self.blocks.clone(),
            },
            Axis::Columns => Table {
                rows: self.rows.clone(),
                columns: self.columns.rename(name),
                blocks: self.blocks.clone(),
            },
        }
    }

    /// Table holding the given columns, in order. The row index is reused as
    /// the same object; blocks are sliced or viewed, never copied.
    pub fn select_columns(&self, positions: &[usize]) -> Result<Table> {
        let blocks = self.blocks.select_columns(positions)?;
        let labels: Vec<Label> = positions
            .iter()
            // select_columns has validated every position
            .map(|&pos| self.columns.label_at(pos).unwrap())
            .collect();
        let mut columns = Index::from_label_list(labels)?;
        if let Some(name) = self.columns.name() {
            columns = columns.rename(name);
        }
        Table::new(self.rows.clone(), columns, blocks)
    }

    /// Label-based counterpart of [`Table::select_columns`]
    pub fn select_columns_by_label(&self, labels: &[Scalar]) -> Result<Table> {
        let positions: Vec<usize> = labels
            .iter()
            .map(|label| {
                self.columns
                    .position_of_scalar(label)
                    .ok_or_else(|| BasaltError::LabelNotFound(label.to_string()))
            })
            .collect::<Result<_>>()?;
        self.select_columns(&positions)
    }

    /// Promote one column to be the row index.
    ///
    /// The new row index is built directly over the column's buffer, so it
    /// shares storage with the original column; the only allocation is the
    /// index wrapper itself. The column disappears from the blocks.
    pub fn set_index(&self, col: usize) -> Result<Table> {
        let label = self
            .columns
            .label_at(col)
            .ok_or(BasaltError::ColumnOutOfRange {
                position: col,
                count: self.columns.len(),
            })?;
        let (index, blocks) = self.blocks.promote_column_to_index(col)?;
        let rows = index.rename(label.to_string());
        let labels: Vec<Label> = (0..self.columns.len())
            .filter(|&pos| pos != col)
            .filter_map(|pos| self.columns.label_at(pos))
            .collect();
        let mut columns = Index::from_label_list(labels)?;
        if let Some(name) = self.columns.name() {
            columns = columns.rename(name);
        }
        Table::new(rows, columns, blocks)
    }

    /// Replace the row index with explicit labels of matching length;
    /// blocks and column index are shared unchanged
    pub fn set_index_from_labels<I>(&self, labels: I) -> Result<Table>
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        let rows = Index::from_labels(labels.into_iter().map(Into::into))?;
        Table::new(rows, self.columns.clone(), self.blocks.clone())
    }

    /// Replace the row index with an auto-incrementing one; blocks and
    /// column index are shared unchanged
    pub fn reset_index(&self) -> Table {
        Table {
            rows: Index::auto(self.blocks.row_count()),
            columns: self.columns.clone(),
            blocks: self.blocks.clone(),
        }
    }

    /// Contiguous row slice; blocks and row labels become views
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> Result<Table> {
        let blocks = self.blocks.slice_rows(range.clone())?;
        let rows = self.rows.slice(range)?;
        Table::new(rows, self.columns.clone(), blocks)
    }

    /// Concatenate tables along an axis.
    ///
    /// Along `Axis::Columns` all inputs must carry an identical row label
    /// sequence; the result references every input's blocks and is fully
    /// no-copy. Along `Axis::Rows` all inputs must carry an identical column
    /// label sequence; each resulting column is one new allocation through
    /// the promotion lattice and the notice reports the copy. The row index
    /// after a vertical concat is auto-incrementing when every input's was;
    /// otherwise it is the concatenation of the input labels, which must not
    /// collide.
    pub fn from_concat(tables: &[&Table], axis: Axis) -> Result<Derived<Table>> {
        let first = match tables.first() {
            Some(first) => first,
            None => {
                let empty = Table::new(
                    Index::auto(0),
                    Index::from_label_list(Vec::new())?,
                    BlockManager::from_buffers(Vec::new())?,
                )?;
                return Ok(Derived::view(empty));
            }
        };
        match axis {
            Axis::Columns => {
                for table in &tables[1..] {
                    if !first.rows.equals(&table.rows) {
                        return Err(BasaltError::AxisAlignment(
                            "horizontal concatenation requires identical row indices".into(),
                        ));
                    }
                }
                let managers: Vec<&BlockManager> = tables.iter().map(|t| &t.blocks).collect();
                let blocks = BlockManager::append_managers(&managers)?;
                let labels: Vec<Label> =
                    tables.iter().flat_map(|t| t.columns.iter()).collect();
                let columns = Index::from_label_list(labels)?;
                Ok(Derived::view(Table::new(
                    first.rows.clone(),
                    columns,
                    blocks,
                )?))
            }
            Axis::Rows => {
                for table in &tables[1..] {
                    if !first.columns.equals(&table.columns) {
                        return Err(BasaltError::AxisAlignment(
                            "vertical concatenation requires identical column indices".into(),
                        ));
                    }
                }
                let managers: Vec<&BlockManager> = tables.iter().map(|t| &t.blocks).collect();
                let derived = BlockManager::concat_rows(&managers)?;
                let rows = if tables.iter().all(|t| t.rows.is_auto()) {
                    Index::auto(derived.value().row_count())
                } else {
                    let parts: Vec<&Index> = tables.iter().map(|t| &t.rows).collect();
                    Index::concat(&parts)?
                };
                let columns = first.columns.clone();
                derived
                    .map(|blocks| Table::new(rows, columns, blocks))
                    .into_result()
            }
        }
    }

    /// Merge adjacent same-typed blocks; a copy when anything merges
    pub fn consolidate(&self) -> Result<Derived<Table>> {
        let rows = self.rows.clone();
        let columns = self.columns.clone();
        self.blocks
            .consolidate()?
            .map(|blocks| Table::new(rows, columns, blocks))
            .into_result()
    }

    /// Boundary write entry point for foreign callers; fails with
    /// [`BasaltError::Immutable`] unconditionally and never partially applies
    pub fn try_set(&self, _row: usize, _col: usize, _value: Scalar) -> Result<()> {
        Err(BasaltError::Immutable)
    }
}
