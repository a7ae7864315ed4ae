//! Quantizing reader.

use super::RowReader;
use matcomp_core::{ColIndexSet, ScaleFactors};

/// Applies `floor(value * scale(row))` to every tuple of an inner reader.
///
/// Scaling happens here, so grouping and encoding never know whether their
/// input was quantized.
#[derive(Debug)]
pub struct QuantizedReader<'s, R> {
    inner: R,
    scales: &'s ScaleFactors,
    buffer: Vec<f64>,
}

impl<'s, R: RowReader> QuantizedReader<'s, R> {
    /// Wrap a reader. Scales must already be validated against the row count.
    pub fn new(inner: R, scales: &'s ScaleFactors) -> Self {
        let buffer = vec![0.0; inner.columns().len()];
        Self {
            inner,
            scales,
            buffer,
        }
    }
}

impl<R: RowReader> RowReader for QuantizedReader<'_, R> {
    fn next_row(&mut self) -> Option<&[f64]> {
        let raw = self.inner.next_row()?;
        self.buffer.copy_from_slice(raw);
        let row = self.inner.current_row()?;
        let scale = self.scales.for_row(row);
        for v in self.buffer.iter_mut() {
            *v = (*v * scale).floor();
        }
        Some(&self.buffer)
    }

    fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    fn current_row(&self) -> Option<usize> {
        self.inner.current_row()
    }

    fn columns(&self) -> &ColIndexSet {
        self.inner.columns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{collect_rows, DenseReader};

    #[test]
    fn test_global_scale() {
        let values = [1.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 4.0];
        let scales = ScaleFactors::Global(0.5);
        let inner = DenseReader::new(&values, 4, 2, ColIndexSet::range(0, 2), 0, 4).unwrap();
        let mut reader = QuantizedReader::new(inner, &scales);

        assert_eq!(
            collect_rows(&mut reader),
            vec![
                vec![0.0, 1.0],
                vec![0.0, 1.0],
                vec![1.0, 2.0],
                vec![1.0, 2.0]
            ]
        );
    }

    #[test]
    fn test_per_row_scale_uses_absolute_row() {
        let values = [10.0, 10.0, 10.0];
        let scales = ScaleFactors::PerRow(vec![0.1, 0.25, 0.33]);
        let inner = DenseReader::new(&values, 3, 1, ColIndexSet::single(0), 1, 3).unwrap();
        let mut reader = QuantizedReader::new(inner, &scales);

        assert_eq!(reader.next_row().unwrap(), &[2.0]);
        assert_eq!(reader.next_row().unwrap(), &[3.0]);
        assert!(!reader.has_next());
    }

    #[test]
    fn test_negative_values_floor_down() {
        let values = [-1.0, -0.1];
        let scales = ScaleFactors::Global(1.0);
        let inner = DenseReader::new(&values, 1, 2, ColIndexSet::range(0, 2), 0, 1).unwrap();
        let mut reader = QuantizedReader::new(inner, &scales);
        assert_eq!(reader.next_row().unwrap(), &[-1.0, -1.0]);
    }
}
