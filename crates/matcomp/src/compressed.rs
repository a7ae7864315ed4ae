//! Compressed matrix blocks and the matrix-like result type.

use matcomp_core::{ColumnGroup, Error, MatrixBlock, Result, BLOCK_HEADER_BYTES};
use std::sync::Arc;

/// A matrix stored as column groups that together cover every column once.
#[derive(Debug)]
pub struct CompressedMatrixBlock {
    rows: usize,
    cols: usize,
    groups: Vec<Box<dyn ColumnGroup>>,
    /// Group index and position within the group for every column.
    column_map: Vec<(usize, usize)>,
}

impl CompressedMatrixBlock {
    /// Assemble a block from column groups.
    ///
    /// Fails unless every group has `rows` rows and the groups cover
    /// `[0, cols)` exactly once.
    pub fn new(rows: usize, cols: usize, groups: Vec<Box<dyn ColumnGroup>>) -> Result<Self> {
        let mut column_map = vec![(usize::MAX, 0); cols];
        for (g, group) in groups.iter().enumerate() {
            if group.num_rows() != rows {
                return Err(Error::shape(format!(
                    "group {g} has {} rows, expected {rows}",
                    group.num_rows()
                )));
            }
            group.columns().validate(cols)?;
            for (pos, col) in group.columns().iter().enumerate() {
                let slot = &mut column_map[col as usize];
                if slot.0 != usize::MAX {
                    return Err(Error::DuplicateColumn(col as usize));
                }
                *slot = (g, pos);
            }
        }
        if let Some(missing) = column_map.iter().position(|(g, _)| *g == usize::MAX) {
            return Err(Error::shape(format!("column {missing} not covered by any group")));
        }
        Ok(Self {
            rows,
            cols,
            groups,
            column_map,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Column groups in column order of their first column.
    pub fn groups(&self) -> &[Box<dyn ColumnGroup>] {
        &self.groups
    }

    /// Value at `(row, col)` without decoding anything else.
    ///
    /// # Panics
    /// Panics if the position is outside the block.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows, "row {row} outside block");
        let (g, pos) = self.column_map[col];
        self.groups[g].get(row, pos)
    }

    /// Reconstruct one full row.
    pub fn decode_row(&self, row: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.cols];
        for group in &self.groups {
            group.decode_row_into(row, &mut out);
        }
        out
    }

    /// Decode every group back into a dense block.
    pub fn decompress(&self) -> Result<MatrixBlock> {
        let mut values = vec![0.0; self.rows * self.cols];
        for (row, chunk) in values.chunks_exact_mut(self.cols.max(1)).enumerate() {
            for group in &self.groups {
                group.decode_row_into(row, chunk);
            }
        }
        MatrixBlock::dense(self.rows, self.cols, values)
    }

    /// In-memory size in bytes.
    pub fn in_memory_size(&self) -> usize {
        BLOCK_HEADER_BYTES
            + self
                .groups
                .iter()
                .map(|g| g.in_memory_size())
                .sum::<usize>()
    }
}

/// A matrix-shaped instruction result: the untouched input or a compressed block.
#[derive(Debug, Clone)]
pub enum MatrixValue {
    /// The input, returned unchanged.
    Uncompressed(Arc<MatrixBlock>),
    /// The compressed replacement.
    Compressed(Arc<CompressedMatrixBlock>),
}

impl MatrixValue {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        match self {
            MatrixValue::Uncompressed(m) => m.rows(),
            MatrixValue::Compressed(m) => m.rows(),
        }
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        match self {
            MatrixValue::Uncompressed(m) => m.cols(),
            MatrixValue::Compressed(m) => m.cols(),
        }
    }

    /// Logical value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            MatrixValue::Uncompressed(m) => m.get(row, col),
            MatrixValue::Compressed(m) => m.get(row, col),
        }
    }

    /// Whether this is a compressed block.
    pub fn is_compressed(&self) -> bool {
        matches!(self, MatrixValue::Compressed(_))
    }

    /// Compressed block, if any.
    pub fn as_compressed(&self) -> Option<&Arc<CompressedMatrixBlock>> {
        match self {
            MatrixValue::Compressed(m) => Some(m),
            MatrixValue::Uncompressed(_) => None,
        }
    }

    /// Uncompressed block, if any.
    pub fn as_uncompressed(&self) -> Option<&Arc<MatrixBlock>> {
        match self {
            MatrixValue::Uncompressed(m) => Some(m),
            MatrixValue::Compressed(_) => None,
        }
    }

    /// In-memory size in bytes.
    pub fn in_memory_size(&self) -> usize {
        match self {
            MatrixValue::Uncompressed(m) => m.in_memory_size(),
            MatrixValue::Compressed(m) => m.in_memory_size(),
        }
    }

    /// Short name of the representation, for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MatrixValue::Uncompressed(_) => "MatrixBlock",
            MatrixValue::Compressed(_) => "CompressedMatrixBlock",
        }
    }
}

impl From<MatrixBlock> for MatrixValue {
    fn from(block: MatrixBlock) -> Self {
        MatrixValue::Uncompressed(Arc::new(block))
    }
}
