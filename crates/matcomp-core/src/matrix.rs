//! Uncompressed matrix blocks.
//!
//! A [`MatrixBlock`] is a fixed-shape grid of `f64` values stored in one of
//! three physical layouts:
//!
//! ```text
//! Dense       [1 2]      values:  [1, 2, 3, 4]          (row-major)
//!             [3 4]
//!
//! Sparse      [1 0]      row_ptr: [0, 1, 2]
//!             [0 4]      col_idx: [0, 1]
//!                        values:  [1, 4]
//!
//! Quantized   raw values as Dense, plus scale factors;
//!             logical value = floor(raw * scale(row))
//! ```

use crate::types::Layout;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fixed bookkeeping charged to every block in size estimates.
pub const BLOCK_HEADER_BYTES: usize = 16;

/// Scale factors applied by quantized reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScaleFactors {
    /// One factor for every row.
    Global(f64),
    /// One factor per row.
    PerRow(Vec<f64>),
}

impl ScaleFactors {
    /// Build from a factor vector for a block of `num_rows` rows.
    ///
    /// A single entry is a global factor; `num_rows` entries are per-row
    /// factors. Any other length is a configuration error.
    pub fn from_vec(factors: Vec<f64>, num_rows: usize) -> Result<Self> {
        match factors.len() {
            1 => Ok(ScaleFactors::Global(factors[0])),
            n if n == num_rows => Ok(ScaleFactors::PerRow(factors)),
            n => Err(Error::ScaleFactorLength {
                actual: n,
                num_rows,
            }),
        }
    }

    /// Factor for an absolute row index.
    #[inline]
    pub fn for_row(&self, row: usize) -> f64 {
        match self {
            ScaleFactors::Global(s) => *s,
            ScaleFactors::PerRow(v) => v[row],
        }
    }

    /// Quantize one raw value of a row.
    #[inline]
    pub fn apply(&self, row: usize, raw: f64) -> f64 {
        (raw * self.for_row(row)).floor()
    }

    /// Number of stored factors.
    pub fn len(&self) -> usize {
        match self {
            ScaleFactors::Global(_) => 1,
            ScaleFactors::PerRow(v) => v.len(),
        }
    }

    /// Always false; a scale vector holds at least one factor.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check the factors fit a block of `num_rows` rows.
    pub fn validate(&self, num_rows: usize) -> Result<()> {
        match self {
            ScaleFactors::PerRow(v) if v.len() != num_rows => Err(Error::ScaleFactorLength {
                actual: v.len(),
                num_rows,
            }),
            _ => Ok(()),
        }
    }
}

/// Compressed sparse row storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrData {
    /// Offsets of each row into `col_idx`/`values` (length = rows + 1).
    pub row_ptr: Vec<usize>,
    /// Column of each stored value, ascending within a row.
    pub col_idx: Vec<u32>,
    /// Stored values.
    pub values: Vec<f64>,
}

impl CsrData {
    /// Column indices and values of one row.
    #[inline]
    pub fn row(&self, row: usize) -> (&[u32], &[f64]) {
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        (&self.col_idx[start..end], &self.values[start..end])
    }

    /// Number of stored values.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn validate(&self, rows: usize, cols: usize) -> Result<()> {
        if self.row_ptr.len() != rows + 1 {
            return Err(Error::shape(format!(
                "row_ptr has {} entries, expected {}",
                self.row_ptr.len(),
                rows + 1
            )));
        }
        if self.col_idx.len() != self.values.len() {
            return Err(Error::shape("col_idx and values differ in length"));
        }
        if self.row_ptr[0] != 0 || self.row_ptr[rows] != self.values.len() {
            return Err(Error::shape("row_ptr must span [0, nnz]"));
        }
        if let Some(r) = self.row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::shape(format!("row_ptr decreases at row {r}")));
        }
        for r in 0..rows {
            let (cols_in_row, _) = self.row(r);
            if cols_in_row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::shape(format!("columns of row {r} not strictly ascending")));
            }
            if let Some(&c) = cols_in_row.last() {
                if c as usize >= cols {
                    return Err(Error::ColumnOutOfRange {
                        index: c as usize,
                        num_cols: cols,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Physical payload of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockData {
    /// Row-major values.
    Dense(Vec<f64>),
    /// Compressed sparse rows.
    Sparse(CsrData),
    /// Row-major raw values with scale factors.
    Quantized {
        values: Vec<f64>,
        scales: ScaleFactors,
    },
}

/// A two-dimensional numeric block.
///
/// Deserialized blocks go through the same shape checks as the constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockRepr")]
pub struct MatrixBlock {
    rows: usize,
    cols: usize,
    data: BlockData,
}

/// Unchecked serialized form of [`MatrixBlock`].
#[derive(Deserialize)]
struct BlockRepr {
    rows: usize,
    cols: usize,
    data: BlockData,
}

impl TryFrom<BlockRepr> for MatrixBlock {
    type Error = Error;

    fn try_from(repr: BlockRepr) -> Result<Self> {
        match repr.data {
            BlockData::Dense(values) => Self::dense(repr.rows, repr.cols, values),
            BlockData::Sparse(csr) => Self::sparse(repr.rows, repr.cols, csr),
            BlockData::Quantized { values, scales } => {
                Self::quantized(repr.rows, repr.cols, values, scales)
            }
        }
    }
}

impl MatrixBlock {
    /// Create a dense block from row-major values.
    pub fn dense(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        check_dense_len(rows, cols, values.len())?;
        Ok(Self {
            rows,
            cols,
            data: BlockData::Dense(values),
        })
    }

    /// Create a dense block from nested rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(Error::shape(format!(
                "row {bad} has {} columns, expected {cols}",
                rows[bad].len()
            )));
        }
        let values = rows.iter().flatten().copied().collect();
        Self::dense(rows.len(), cols, values)
    }

    /// Create a sparse block from CSR arrays.
    pub fn sparse(rows: usize, cols: usize, csr: CsrData) -> Result<Self> {
        csr.validate(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            data: BlockData::Sparse(csr),
        })
    }

    /// Create a quantized block from raw row-major values and scale factors.
    pub fn quantized(
        rows: usize,
        cols: usize,
        values: Vec<f64>,
        scales: ScaleFactors,
    ) -> Result<Self> {
        check_dense_len(rows, cols, values.len())?;
        scales.validate(rows)?;
        Ok(Self {
            rows,
            cols,
            data: BlockData::Quantized { values, scales },
        })
    }

    /// An all-zero dense block.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: BlockData::Dense(vec![0.0; rows * cols]),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the block has no cells.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Layout tag of the payload.
    pub fn layout(&self) -> Layout {
        match self.data {
            BlockData::Dense(_) => Layout::Dense,
            BlockData::Sparse(_) => Layout::Sparse,
            BlockData::Quantized { .. } => Layout::Quantized,
        }
    }

    /// Physical payload.
    pub fn data(&self) -> &BlockData {
        &self.data
    }

    /// Row-major values of a dense block.
    pub fn dense_values(&self) -> Option<&[f64]> {
        match &self.data {
            BlockData::Dense(v) => Some(v),
            _ => None,
        }
    }

    /// CSR payload of a sparse block.
    pub fn sparse_data(&self) -> Option<&CsrData> {
        match &self.data {
            BlockData::Sparse(csr) => Some(csr),
            _ => None,
        }
    }

    /// Logical value at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is outside the block.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "({row}, {col}) outside block");
        match &self.data {
            BlockData::Dense(v) => v[row * self.cols + col],
            BlockData::Sparse(csr) => {
                let (cols, values) = csr.row(row);
                cols.binary_search(&(col as u32))
                    .map(|i| values[i])
                    .unwrap_or(0.0)
            }
            BlockData::Quantized { values, scales } => {
                scales.apply(row, values[row * self.cols + col])
            }
        }
    }

    /// All logical values of a row.
    pub fn row_values(&self, row: usize) -> Vec<f64> {
        (0..self.cols).map(|c| self.get(row, c)).collect()
    }

    /// All cells read as a flat vector (used for operand vectors such as scale factors).
    pub fn to_flat_vec(&self) -> Vec<f64> {
        match &self.data {
            BlockData::Dense(v) => v.clone(),
            _ => (0..self.rows).flat_map(|r| self.row_values(r)).collect(),
        }
    }

    /// Number of non-zero logical values.
    pub fn non_zeros(&self) -> usize {
        match &self.data {
            BlockData::Dense(v) => v.iter().filter(|x| **x != 0.0).count(),
            BlockData::Sparse(csr) => csr.values.iter().filter(|x| **x != 0.0).count(),
            BlockData::Quantized { .. } => (0..self.rows)
                .map(|r| self.row_values(r).iter().filter(|x| **x != 0.0).count())
                .sum(),
        }
    }

    /// Estimated in-memory size in bytes.
    pub fn in_memory_size(&self) -> usize {
        BLOCK_HEADER_BYTES
            + match &self.data {
                BlockData::Dense(v) => v.len() * 8,
                BlockData::Sparse(csr) => {
                    csr.row_ptr.len() * 8 + csr.col_idx.len() * 4 + csr.values.len() * 8
                }
                BlockData::Quantized { values, scales } => values.len() * 8 + scales.len() * 8,
            }
    }

    /// Convert to a sparse block with the same logical values.
    ///
    /// Only `+0.0` cells are dropped; `-0.0` is stored so the sign survives.
    pub fn to_sparse(&self) -> MatrixBlock {
        let mut row_ptr = Vec::with_capacity(self.rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for r in 0..self.rows {
            for c in 0..self.cols {
                let v = self.get(r, c);
                if v.to_bits() != 0 {
                    col_idx.push(c as u32);
                    values.push(v);
                }
            }
            row_ptr.push(values.len());
        }
        MatrixBlock {
            rows: self.rows,
            cols: self.cols,
            data: BlockData::Sparse(CsrData {
                row_ptr,
                col_idx,
                values,
            }),
        }
    }
}

fn check_dense_len(rows: usize, cols: usize, len: usize) -> Result<()> {
    if rows.checked_mul(cols) != Some(len) {
        return Err(Error::shape(format!(
            "{len} values do not fill a {rows}x{cols} block"
        )));
    }
    Ok(())
}
