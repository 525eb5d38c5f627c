//! Blocks and the block manager
//!
//! A [`Block`] is one buffer holding 1..N same-typed columns stored
//! contiguously (column-major). The [`BlockManager`] keeps an ordered list
//! of blocks plus a table mapping each logical column position to
//! (block index, intra-block offset). Column selection, promotion and
//! horizontal concatenation all operate on this metadata; the block buffers
//! themselves are only ever referenced, sliced or viewed — vertical
//! concatenation and consolidation are the copying exceptions and are
//! flagged as such.

use crate::buffer::{Buffer, BufferBuilder, Shape};
use crate::data::{DType, Scalar};
use crate::derive::{self, Derived};
use crate::{BasaltError, Result};
use log::debug;

/// One buffer holding a contiguous run of same-typed columns
#[derive(Debug, Clone)]
pub struct Block {
    buffer: Buffer,
}

impl Block {
    pub fn new(buffer: Buffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn row_count(&self) -> usize {
        self.buffer.row_count()
    }

    pub fn col_count(&self) -> usize {
        self.buffer.col_count()
    }

    /// 1-D view of one column within this block
    pub fn column(&self, offset: usize) -> Result<Buffer> {
        self.buffer.column(offset)
    }
}

/// Ordered blocks plus the logical-column-position lookup table
#[derive(Debug, Clone)]
pub struct BlockManager {
    blocks: Vec<Block>,
    /// Per logical column: (block index, intra-block column offset)
    locations: Vec<(usize, usize)>,
    row_count: usize,
}

fn locations_for(blocks: &[Block]) -> Vec<(usize, usize)> {
    let mut locations = Vec::new();
    for (bi, block) in blocks.iter().enumerate() {
        for offset in 0..block.col_count() {
            locations.push((bi, offset));
        }
    }
    locations
}

impl BlockManager {
    /// Assemble from column buffers; each becomes one block by reference.
    /// All buffers must agree on row count.
    pub fn from_buffers(buffers: Vec<Buffer>) -> Result<BlockManager> {
        let row_count = buffers.first().map(|b| b.row_count()).unwrap_or(0);
        for buffer in &buffers {
            if buffer.row_count() != row_count {
                return Err(BasaltError::ShapeMismatch {
                    expected: Shape::One(row_count),
                    actual: buffer.shape(),
                });
            }
        }
        let blocks: Vec<Block> = buffers.into_iter().map(Block::new).collect();
        let locations = locations_for(&blocks);
        Ok(BlockManager {
            blocks,
            locations,
            row_count,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.locations.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Element types per logical column
    pub fn dtypes(&self) -> Vec<DType> {
        self.locations
            .iter()
            .map(|&(bi, _)| self.blocks[bi].dtype())
            .collect()
    }

    /// Read one element by (row, logical column)
    pub fn get(&self, row: usize, col: usize) -> Result<Scalar> {
        let &(bi, offset) = self
            .locations
            .get(col)
            .ok_or(BasaltError::ColumnOutOfRange {
                position: col,
                count: self.col_count(),
            })?;
        if row >= self.row_count {
            return Err(BasaltError::RowOutOfRange {
                position: row,
                count: self.row_count,
            });
        }
        self.blocks[bi].buffer().get(row, offset)
    }

    /// 1-D view of one logical column; shares the block's storage
    pub fn column_view(&self, col: usize) -> Result<Buffer> {
        let &(bi, offset) = self
            .locations
            .get(col)
            .ok_or(BasaltError::ColumnOutOfRange {
                position: col,
                count: self.col_count(),
            })?;
        self.blocks[bi].column(offset)
    }

    /// New manager holding the given logical columns, in order.
    ///
    /// Runs of positions that are contiguous within one block become column
    /// slices of that block's buffer; scattered positions become per-column
    /// views. Either way no bytes are duplicated — only offset, stride and
    /// lookup metadata change. Out-of-range positions fail before anything
    /// is constructed.
    pub fn select_columns(&self, positions: &[usize]) -> Result<BlockManager> {
        for &pos in positions {
            if pos >= self.col_count() {
                return Err(BasaltError::ColumnOutOfRange {
                    position: pos,
                    count: self.col_count(),
                });
            }
        }
        let mut blocks = Vec::new();
        let mut i = 0;
        while i < positions.len() {
            let (bi, start) = self.locations[positions[i]];
            let mut len = 1;
            while i + len < positions.len() {
                let (nbi, noff) = self.locations[positions[i + len]];
                if nbi != bi || noff != start + len {
                    break;
                }
                len += 1;
            }
            let source = &self.blocks[bi];
            let buffer = if len == source.col_count() {
                source.buffer().clone()
            } else if len == 1 {
                source.column(start)?
            } else {
                source.buffer().slice_cols(start..start + len)?
            };
            blocks.push(Block::new(buffer));
            i += len;
        }
        let locations = locations_for(&blocks);
        Ok(BlockManager {
            blocks,
            locations,
            row_count: self.row_count,
        })
    }

    /// Contiguous row slice of every block; pure metadata.
    pub fn slice_rows(&self, range: std::ops::Range<usize>) -> Result<BlockManager> {
        if range.start > range.end || range.end > self.row_count {
            return Err(BasaltError::RowOutOfRange {
                position: range.end,
                count: self.row_count,
            });
        }
        let blocks: Vec<Block> = self
            .blocks
            .iter()
            .map(|block| block.buffer().slice_rows(range.clone()).map(Block::new))
            .collect::<Result<_>>()?;
        let locations = locations_for(&blocks);
        Ok(BlockManager {
            blocks,
            locations,
            row_count: range.len(),
        })
    }

    /// Extract one column as a 1-D view and return the manager without it.
    ///
    /// Removing an edge column of a block is a slice-boundary shrink;
    /// removing an interior column splits the block into two views. The
    /// surviving column buffers are unchanged either way.
    pub fn extract_column(&self, col: usize) -> Result<(Buffer, BlockManager)> {
        let &(target_bi, target_off) =
            self.locations
                .get(col)
                .ok_or(BasaltError::ColumnOutOfRange {
                    position: col,
                    count: self.col_count(),
                })?;
        let extracted = self.blocks[target_bi].column(target_off)?;

        let mut blocks = Vec::with_capacity(self.blocks.len() + 1);
        for (bi, block) in self.blocks.iter().enumerate() {
            if bi != target_bi {
                blocks.push(block.clone());
                continue;
            }
            let cols = block.col_count();
            if cols == 1 {
                continue;
            }
            if target_off > 0 {
                blocks.push(Block::new(block.buffer().slice_cols(0..target_off)?));
            }
            if target_off + 1 < cols {
                blocks.push(Block::new(block.buffer().slice_cols(target_off + 1..cols)?));
            }
        }
        let locations = locations_for(&blocks);
        Ok((
            extracted,
            BlockManager {
                blocks,
                locations,
                row_count: self.row_count,
            },
        ))
    }

    /// Build an index over one column's buffer (no copy, storage shared)
    /// and return the manager without that column.
    pub fn promote_column_to_index(&self, col: usize) -> Result<(crate::index::Index, BlockManager)> {
        let (buffer, rest) = self.extract_column(col)?;
        Ok((crate::index::Index::from_buffer(buffer)?, rest))
    }

    /// Horizontal concatenation: append every input's blocks by reference.
    /// Fully no-copy; inputs must agree on row count (label alignment is the
    /// table layer's concern).
    pub fn append_managers(managers: &[&BlockManager]) -> Result<BlockManager> {
        let row_count = managers.first().map(|m| m.row_count).unwrap_or(0);
        for manager in managers {
            if manager.row_count != row_count {
                return Err(BasaltError::ShapeMismatch {
                    expected: Shape::One(row_count),
                    actual: Shape::One(manager.row_count),
                });
            }
        }
        let blocks: Vec<Block> = managers
            .iter()
            .flat_map(|m| m.blocks.iter().cloned())
            .collect();
        let locations = locations_for(&blocks);
        Ok(BlockManager {
            blocks,
            locations,
            row_count,
        })
    }

    /// Vertical concatenation: one new buffer per resulting column, built
    /// through the promotion lattice. Inherently a copy; the notice reports
    /// it (a single input passes through as views).
    pub fn concat_rows(managers: &[&BlockManager]) -> Result<Derived<BlockManager>> {
        let col_count = managers.first().map(|m| m.col_count()).unwrap_or(0);
        for manager in managers {
            if manager.col_count() != col_count {
                return Err(BasaltError::ShapeMismatch {
                    expected: Shape::One(col_count),
                    actual: Shape::One(manager.col_count()),
                });
            }
        }
        let mut copied = false;
        let mut buffers = Vec::with_capacity(col_count);
        for col in 0..col_count {
            let parts: Vec<Buffer> = managers
                .iter()
                .map(|m| m.column_view(col))
                .collect::<Result<_>>()?;
            let derived = derive::concat_column(&parts)?;
            copied |= derived.was_copied();
            buffers.push(derived.into_value());
        }
        let manager = BlockManager::from_buffers(buffers)?;
        Ok(if copied {
            Derived::copied(manager)
        } else {
            Derived::view(manager)
        })
    }

    /// Merge adjacent same-typed blocks into single contiguous blocks.
    ///
    /// Already-consolidated managers pass through as views; any merge
    /// allocates and the notice reports it.
    pub fn consolidate(&self) -> Result<Derived<BlockManager>> {
        let mut groups: Vec<Vec<&Block>> = Vec::new();
        for block in &self.blocks {
            match groups.last_mut() {
                Some(group) if group[0].dtype() == block.dtype() => group.push(block),
                _ => groups.push(vec![block]),
            }
        }
        if groups.iter().all(|g| g.len() == 1) {
            return Ok(Derived::view(self.clone()));
        }
        let mut blocks = Vec::with_capacity(groups.len());
        for group in groups {
            if group.len() == 1 {
                blocks.push(group[0].clone());
                continue;
            }
            let cols: usize = group.iter().map(|b| b.col_count()).sum();
            debug!(
                "copy fallback: consolidating {} blocks into one {}x{} block",
                group.len(),
                self.row_count,
                cols
            );
            let mut builder =
                BufferBuilder::with_capacity(group[0].dtype(), self.row_count * cols);
            for block in group {
                for offset in 0..block.col_count() {
                    for value in block.column(offset)?.iter() {
                        builder.push(value)?;
                    }
                }
            }
            blocks.push(Block::new(builder.freeze_columns(self.row_count, cols)?));
        }
        let locations = locations_for(&blocks);
        Ok(Derived::copied(BlockManager {
            blocks,
            locations,
            row_count: self.row_count,
        }))
    }
}
