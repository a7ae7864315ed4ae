//! Reader over row-major dense values.

use super::{RowCursor, RowReader};
use matcomp_core::{ColIndexSet, Result};

/// Reads selected columns straight out of a row-major buffer.
#[derive(Debug)]
pub struct DenseReader<'a> {
    values: &'a [f64],
    num_cols: usize,
    columns: ColIndexSet,
    cursor: RowCursor,
    buffer: Vec<f64>,
}

impl<'a> DenseReader<'a> {
    /// Create a reader over `values` laid out as `num_rows x num_cols`.
    pub fn new(
        values: &'a [f64],
        num_rows: usize,
        num_cols: usize,
        columns: ColIndexSet,
        low: usize,
        high: usize,
    ) -> Result<Self> {
        let cursor = RowCursor::new(num_rows, num_cols, &columns, low, high)?;
        let buffer = vec![0.0; columns.len()];
        Ok(Self {
            values,
            num_cols,
            columns,
            cursor,
            buffer,
        })
    }
}

impl RowReader for DenseReader<'_> {
    fn next_row(&mut self) -> Option<&[f64]> {
        let row = self.cursor.advance()?;
        let offset = row * self.num_cols;
        for (slot, col) in self.buffer.iter_mut().zip(self.columns.iter()) {
            *slot = self.values[offset + col as usize];
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_columns() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let cols = ColIndexSet::new(vec![2, 0]).unwrap();
        let mut reader = DenseReader::new(&values, 2, 3, cols, 0, 2).unwrap();

        assert!(reader.has_next());
        assert_eq!(reader.next_row().unwrap(), &[1.0, 3.0]);
        assert_eq!(reader.current_row(), Some(0));
        assert_eq!(reader.next_row().unwrap(), &[4.0, 6.0]);
        assert_eq!(reader.current_row(), Some(1));
        assert!(reader.next_row().is_none());
    }

    #[test]
    fn test_empty_range() {
        let values = [1.0, 2.0];
        let mut reader = DenseReader::new(&values, 1, 2, ColIndexSet::single(0), 1, 1).unwrap();
        assert!(!reader.has_next());
        assert!(reader.next_row().is_none());
        assert_eq!(reader.current_row(), None);
    }
}
