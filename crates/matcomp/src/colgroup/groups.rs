//! Column-group encoders.

use super::mapping::CodeMap;
use matcomp_core::{ColIndexSet, ColumnGroup, EncodingKind};

/// Group whose values are all zero.
#[derive(Debug, Clone)]
pub struct EmptyGroup {
    columns: ColIndexSet,
    rows: usize,
}

impl EmptyGroup {
    /// Create an all-zero group.
    pub fn new(columns: ColIndexSet, rows: usize) -> Self {
        Self { columns, rows }
    }
}

impl ColumnGroup for EmptyGroup {
    fn columns(&self) -> &ColIndexSet {
        &self.columns
    }

    fn encoding(&self) -> EncodingKind {
        EncodingKind::Empty
    }

    fn num_rows(&self) -> usize {
        self.rows
    }

    fn distinct(&self) -> usize {
        1
    }

    fn get(&self, _row: usize, _position: usize) -> f64 {
        0.0
    }

    fn decode_row_into(&self, _row: usize, out: &mut [f64]) {
        for col in self.columns.iter() {
            out[col as usize] = 0.0;
        }
    }

    fn in_memory_size(&self) -> usize {
        EncodingKind::Empty.estimate_size(self.rows, self.columns.len(), 1)
    }
}

/// Group where every row holds the same tuple.
#[derive(Debug, Clone)]
pub struct ConstGroup {
    columns: ColIndexSet,
    rows: usize,
    tuple: Vec<f64>,
}

impl ConstGroup {
    /// Create a constant group. `tuple` holds one value per column.
    pub fn new(columns: ColIndexSet, rows: usize, tuple: Vec<f64>) -> Self {
        debug_assert_eq!(columns.len(), tuple.len());
        Self {
            columns,
            rows,
            tuple,
        }
    }

    /// The repeated tuple.
    pub fn tuple(&self) -> &[f64] {
        &self.tuple
    }
}

impl ColumnGroup for ConstGroup {
    fn columns(&self) -> &ColIndexSet {
        &self.columns
    }

    fn encoding(&self) -> EncodingKind {
        EncodingKind::Const
    }

    fn num_rows(&self) -> usize {
        self.rows
    }

    fn distinct(&self) -> usize {
        1
    }

    fn get(&self, _row: usize, position: usize) -> f64 {
        self.tuple[position]
    }

    fn in_memory_size(&self) -> usize {
        EncodingKind::Const.estimate_size(self.rows, self.columns.len(), 1)
    }
}

/// Dense dictionary coding: distinct tuples plus one code per row.
#[derive(Debug, Clone)]
pub struct DdcGroup {
    columns: ColIndexSet,
    /// Distinct tuples, `distinct * width` values, tuple-major.
    dictionary: Vec<f64>,
    codes: CodeMap,
}

impl DdcGroup {
    /// Create a dictionary-coded group.
    pub fn new(columns: ColIndexSet, dictionary: Vec<f64>, codes: CodeMap) -> Self {
        debug_assert_eq!(dictionary.len() % columns.len(), 0);
        Self {
            columns,
            dictionary,
            codes,
        }
    }

    /// Flat dictionary, tuple-major.
    pub fn dictionary(&self) -> &[f64] {
        &self.dictionary
    }

    /// Row codes.
    pub fn codes(&self) -> &CodeMap {
        &self.codes
    }

    #[inline]
    fn tuple(&self, row: usize) -> &[f64] {
        let width = self.columns.len();
        let start = self.codes.get(row) * width;
        &self.dictionary[start..start + width]
    }
}

impl ColumnGroup for DdcGroup {
    fn columns(&self) -> &ColIndexSet {
        &self.columns
    }

    fn encoding(&self) -> EncodingKind {
        EncodingKind::Ddc
    }

    fn num_rows(&self) -> usize {
        self.codes.len()
    }

    fn distinct(&self) -> usize {
        self.dictionary.len() / self.columns.len()
    }

    fn get(&self, row: usize, position: usize) -> f64 {
        self.tuple(row)[position]
    }

    fn decode_row_into(&self, row: usize, out: &mut [f64]) {
        for (&v, col) in self.tuple(row).iter().zip(self.columns.iter()) {
            out[col as usize] = v;
        }
    }

    fn in_memory_size(&self) -> usize {
        EncodingKind::Ddc.estimate_size(self.num_rows(), self.columns.len(), self.distinct())
    }
}

/// Raw values of the group's columns, row-major.
#[derive(Debug, Clone)]
pub struct UncompressedGroup {
    columns: ColIndexSet,
    rows: usize,
    values: Vec<f64>,
    distinct: usize,
}

impl UncompressedGroup {
    /// Create from row-major values of the selected columns.
    pub fn new(columns: ColIndexSet, rows: usize, values: Vec<f64>, distinct: usize) -> Self {
        debug_assert_eq!(values.len(), rows * columns.len());
        Self {
            columns,
            rows,
            values,
            distinct,
        }
    }
}

impl ColumnGroup for UncompressedGroup {
    fn columns(&self) -> &ColIndexSet {
        &self.columns
    }

    fn encoding(&self) -> EncodingKind {
        EncodingKind::Uncompressed
    }

    fn num_rows(&self) -> usize {
        self.rows
    }

    fn distinct(&self) -> usize {
        self.distinct
    }

    fn get(&self, row: usize, position: usize) -> f64 {
        self.values[row * self.columns.len() + position]
    }

    fn in_memory_size(&self) -> usize {
        EncodingKind::Uncompressed.estimate_size(self.rows, self.columns.len(), self.distinct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddc_decodes_single_rows() {
        let cols = ColIndexSet::new(vec![1, 3]).unwrap();
        let group = DdcGroup::new(
            cols,
            vec![1.0, 2.0, 3.0, 4.0],
            CodeMap::from_codes(vec![0, 0, 1, 1], 2),
        );
        assert_eq!(group.distinct(), 2);
        assert_eq!(group.num_rows(), 4);
        assert_eq!(group.get(2, 1), 4.0);

        let mut out = vec![-1.0; 4];
        group.decode_row_into(3, &mut out);
        assert_eq!(out, vec![-1.0, 3.0, -1.0, 4.0]);
    }

    #[test]
    fn test_sizes_match_estimates() {
        let cols = ColIndexSet::range(0, 2);
        let ddc = DdcGroup::new(
            cols.clone(),
            vec![1.0, 2.0, 3.0, 4.0],
            CodeMap::from_codes(vec![0, 0, 1, 1], 2),
        );
        assert_eq!(
            ddc.in_memory_size(),
            EncodingKind::Ddc.estimate_size(4, 2, 2)
        );

        let constant = ConstGroup::new(cols.clone(), 10, vec![5.0, 6.0]);
        assert!(constant.in_memory_size() < ddc.in_memory_size());
        assert_eq!(constant.get(9, 1), 6.0);

        let empty = EmptyGroup::new(cols, 10);
        assert!(empty.in_memory_size() < constant.in_memory_size());
    }

    #[test]
    fn test_uncompressed_default_decode() {
        let group = UncompressedGroup::new(ColIndexSet::single(1), 2, vec![7.0, 8.0], 2);
        let mut out = vec![0.0; 2];
        group.decode_row_into(1, &mut out);
        assert_eq!(out, vec![0.0, 8.0]);
    }
}
