//! Column-selecting row readers.
//!
//! A reader turns a block plus a [`ColIndexSet`] into a finite sequence of
//! row tuples holding only the selected columns. Every layout produces the
//! same tuples for the same logical content, so the encoders never look at
//! the physical layout.
//!
//! ```text
//!  block (any layout)        selection [0, 2]        tuples
//!  [1 5 2]                                           [1 2]
//!  [0 5 0]          ──▶      reader(rl..ru)   ──▶    [0 0]
//!  [3 5 4]                                           [3 4]
//! ```
//!
//! Tuples are borrowed from the reader's internal buffer and stay valid until
//! the next call to [`RowReader::next_row`]; copy them to keep them longer.

mod dense;
mod quantized;
mod sparse;

pub use dense::DenseReader;
pub use quantized::QuantizedReader;
pub use sparse::SparseReader;

use matcomp_core::{BlockData, ColIndexSet, Error, MatrixBlock, Result, ScaleFactors};

/// Sequential reader of column-selected row tuples.
pub trait RowReader {
    /// Produce the next row tuple, or `None` once the range is exhausted.
    fn next_row(&mut self) -> Option<&[f64]>;

    /// Whether another row remains in the range.
    fn has_next(&self) -> bool;

    /// Absolute index of the row returned by the last successful read.
    fn current_row(&self) -> Option<usize>;

    /// Columns selected by this reader.
    fn columns(&self) -> &ColIndexSet;
}

impl<R: RowReader + ?Sized> RowReader for Box<R> {
    fn next_row(&mut self) -> Option<&[f64]> {
        (**self).next_row()
    }

    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn current_row(&self) -> Option<usize> {
        (**self).current_row()
    }

    fn columns(&self) -> &ColIndexSet {
        (**self).columns()
    }
}

/// Cursor over a validated row range, shared by every reader.
#[derive(Debug, Clone)]
pub(crate) struct RowCursor {
    next: usize,
    end: usize,
    current: Option<usize>,
}

impl RowCursor {
    /// Validate a selection and row range against a block shape.
    ///
    /// `high` beyond the row count is clamped; `low` past the clamped end is rejected.
    pub(crate) fn new(
        num_rows: usize,
        num_cols: usize,
        columns: &ColIndexSet,
        low: usize,
        high: usize,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::EmptyColumnSelection);
        }
        columns.validate(num_cols)?;
        let end = high.min(num_rows);
        if low > end {
            return Err(Error::InvalidRowRange {
                low,
                high,
                num_rows,
            });
        }
        Ok(Self {
            next: low,
            end,
            current: None,
        })
    }

    #[inline]
    pub(crate) fn advance(&mut self) -> Option<usize> {
        if self.next >= self.end {
            return None;
        }
        let row = self.next;
        self.next += 1;
        self.current = Some(row);
        Some(row)
    }

    #[inline]
    pub(crate) fn has_next(&self) -> bool {
        self.next < self.end
    }

    #[inline]
    pub(crate) fn current(&self) -> Option<usize> {
        self.current
    }
}

/// Create a reader for the block's layout.
///
/// When `scales` is given, values are quantized on read with
/// `floor(value * scale(row))`, on top of any quantization the block's own
/// layout carries.
///
/// # Arguments
/// * `block` - Source block, never mutated
/// * `columns` - Non-empty selection within `[0, block.cols())`
/// * `low`, `high` - Row range `[low, high)`; `high` is clamped to the row count
/// * `scales` - Optional quantization factors
pub fn create<'a>(
    block: &'a MatrixBlock,
    columns: &ColIndexSet,
    low: usize,
    high: usize,
    scales: Option<&'a ScaleFactors>,
) -> Result<Box<dyn RowReader + Send + 'a>> {
    let base: Box<dyn RowReader + Send + 'a> = match block.data() {
        BlockData::Dense(values) => Box::new(DenseReader::new(
            values,
            block.rows(),
            block.cols(),
            columns.clone(),
            low,
            high,
        )?),
        BlockData::Sparse(csr) => Box::new(SparseReader::new(
            csr,
            block.rows(),
            block.cols(),
            columns.clone(),
            low,
            high,
        )?),
        BlockData::Quantized { values, scales } => Box::new(QuantizedReader::new(
            DenseReader::new(values, block.rows(), block.cols(), columns.clone(), low, high)?,
            scales,
        )),
    };

    match scales {
        Some(scales) => {
            scales.validate(block.rows())?;
            Ok(Box::new(QuantizedReader::new(base, scales)))
        }
        None => Ok(base),
    }
}

/// Read every remaining tuple into owned rows.
pub fn collect_rows<R: RowReader + ?Sized>(reader: &mut R) -> Vec<Vec<f64>> {
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row() {
        rows.push(row.to_vec());
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> MatrixBlock {
        MatrixBlock::from_rows(&[
            vec![1.0, 5.0, 2.0],
            vec![0.0, 5.0, 0.0],
            vec![3.0, 5.0, 4.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_create_dispatches_on_layout() {
        let dense = block();
        let sparse = dense.to_sparse();
        let cols = ColIndexSet::new(vec![0, 2]).unwrap();

        let a = collect_rows(&mut create(&dense, &cols, 0, 3, None).unwrap());
        let b = collect_rows(&mut create(&sparse, &cols, 0, 3, None).unwrap());
        assert_eq!(a, vec![vec![1.0, 2.0], vec![0.0, 0.0], vec![3.0, 4.0]]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_selection_rejected() {
        let dense = block();
        let cols = ColIndexSet::new(vec![]).unwrap();
        assert!(matches!(
            create(&dense, &cols, 0, 3, None),
            Err(Error::EmptyColumnSelection)
        ));
    }

    #[test]
    fn test_row_range_clamped_and_rejected() {
        let dense = block();
        let cols = ColIndexSet::single(1);

        let mut reader = create(&dense, &cols, 1, 100, None).unwrap();
        assert_eq!(collect_rows(&mut reader).len(), 2);

        assert!(matches!(
            create(&dense, &cols, 4, 10, None),
            Err(Error::InvalidRowRange { low: 4, .. })
        ));
    }

    #[test]
    fn test_column_out_of_range_rejected() {
        let dense = block();
        let cols = ColIndexSet::new(vec![1, 3]).unwrap();
        assert!(matches!(
            create(&dense, &cols, 0, 3, None),
            Err(Error::ColumnOutOfRange { index: 3, num_cols: 3 })
        ));
    }

    #[test]
    fn test_scales_validated_against_rows() {
        let dense = block();
        let cols = ColIndexSet::single(0);
        let scales = ScaleFactors::PerRow(vec![1.0, 2.0]);
        assert!(matches!(
            create(&dense, &cols, 0, 3, Some(&scales)),
            Err(Error::ScaleFactorLength { actual: 2, num_rows: 3 })
        ));
    }

    #[test]
    fn test_not_restartable() {
        let dense = block();
        let cols = ColIndexSet::single(0);
        let mut reader = create(&dense, &cols, 0, 3, None).unwrap();
        assert_eq!(collect_rows(&mut reader).len(), 3);
        assert!(!reader.has_next());
        assert!(reader.next_row().is_none());
        assert_eq!(reader.current_row(), Some(2));
    }
}
