//! Reader over compressed sparse rows.

use super::{RowCursor, RowReader};
use matcomp_core::{ColIndexSet, CsrData, Result};

/// Rebuilds dense tuples from CSR rows, zero filling absent entries.
#[derive(Debug)]
pub struct SparseReader<'a> {
    csr: &'a CsrData,
    columns: ColIndexSet,
    cursor: RowCursor,
    buffer: Vec<f64>,
}

impl<'a> SparseReader<'a> {
    /// Create a reader over a `num_rows x num_cols` CSR payload.
    pub fn new(
        csr: &'a CsrData,
        num_rows: usize,
        num_cols: usize,
        columns: ColIndexSet,
        low: usize,
        high: usize,
    ) -> Result<Self> {
        let cursor = RowCursor::new(num_rows, num_cols, &columns, low, high)?;
        let buffer = vec![0.0; columns.len()];
        Ok(Self {
            csr,
            columns,
            cursor,
            buffer,
        })
    }
}

impl RowReader for SparseReader<'_> {
    fn next_row(&mut self) -> Option<&[f64]> {
        let row = self.cursor.advance()?;
        let (row_cols, row_values) = self.csr.row(row);
        let selected = self.columns.as_slice();

        // Both column lists are ascending: merge them.
        let mut k = 0;
        for (slot, &col) in self.buffer.iter_mut().zip(selected) {
            while k < row_cols.len() && row_cols[k] < col {
                k += 1;
            }
            *slot = if k < row_cols.len() && row_cols[k] == col {
                row_values[k]
            } else {
                0.0
            };
        }
        Some(&self.buffer)
    }

    fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    fn current_row(&self) -> Option<usize> {
        self.cursor.current()
    }

    fn columns(&self) -> &ColIndexSet {
        &self.columns
    }
}
