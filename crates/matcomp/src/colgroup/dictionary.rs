//! Tuple dictionaries collected from row readers.
//!
//! Each worker scans its own contiguous row range into a
//! [`TupleDictionary`]. Partials are merged in row-range order, which keeps
//! dictionary codes in first-appearance order no matter how many workers
//! took part.

use super::groups::{ConstGroup, DdcGroup, EmptyGroup, UncompressedGroup};
use super::mapping::CodeMap;
use crate::readers::RowReader;
use matcomp_core::{ColIndexSet, ColumnGroup, EncodingKind, Error, Result};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Bit pattern of a tuple, so `-0.0` and NaN payloads survive exactly.
type TupleKey = SmallVec<[u64; 4]>;

fn key_of(tuple: &[f64]) -> TupleKey {
    tuple.iter().map(|v| v.to_bits()).collect()
}

/// Distinct tuples of a column group and the code of every scanned row.
#[derive(Debug, Clone)]
pub struct TupleDictionary {
    columns: ColIndexSet,
    index: HashMap<TupleKey, u32>,
    /// Distinct tuples in first-appearance order, tuple-major.
    tuples: Vec<f64>,
    codes: Vec<u32>,
}

impl TupleDictionary {
    /// Create an empty dictionary for a column group.
    pub fn new(columns: ColIndexSet) -> Self {
        Self {
            columns,
            index: HashMap::new(),
            tuples: Vec::new(),
            codes: Vec::new(),
        }
    }

    /// Scan every remaining row of a reader.
    pub fn scan<R: RowReader + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut dict = Self::new(reader.columns().clone());
        while let Some(tuple) = reader.next_row() {
            let code = dict.code_for(tuple)?;
            dict.codes.push(code);
        }
        Ok(dict)
    }

    /// Append one row tuple.
    pub fn push(&mut self, tuple: &[f64]) -> Result<()> {
        let code = self.code_for(tuple)?;
        self.codes.push(code);
        Ok(())
    }

    fn code_for(&mut self, tuple: &[f64]) -> Result<u32> {
        let key = key_of(tuple);
        if let Some(&code) = self.index.get(&key) {
            return Ok(code);
        }
        let code = u32::try_from(self.index.len()).map_err(|_| {
            Error::encoder(self.columns.as_slice(), "dictionary exceeds u32 code space")
        })?;
        self.index.insert(key, code);
        self.tuples.extend_from_slice(tuple);
        Ok(code)
    }

    /// Number of distinct tuples.
    pub fn distinct(&self) -> usize {
        self.index.len()
    }

    /// Number of scanned rows.
    pub fn rows(&self) -> usize {
        self.codes.len()
    }

    /// Columns of the group.
    pub fn columns(&self) -> &ColIndexSet {
        &self.columns
    }

    /// Append another partial that covers the rows right after this one.
    pub fn append(&mut self, other: TupleDictionary) -> Result<()> {
        let width = self.columns.len();
        let mut remap = Vec::with_capacity(other.distinct());
        for tuple in other.tuples.chunks_exact(width.max(1)) {
            remap.push(self.code_for(tuple)?);
        }
        self.codes
            .extend(other.codes.into_iter().map(|c| remap[c as usize]));
        Ok(())
    }

    /// Merge partials given in row-range order.
    pub fn merge(parts: Vec<TupleDictionary>, columns: &ColIndexSet) -> Result<TupleDictionary> {
        let mut parts = parts.into_iter();
        let mut merged = parts
            .next()
            .unwrap_or_else(|| TupleDictionary::new(columns.clone()));
        for part in parts {
            merged.append(part)?;
        }
        Ok(merged)
    }

    /// Encoding this dictionary will be built with.
    pub fn choose_encoding(&self) -> EncodingKind {
        let width = self.columns.len();
        if self.distinct() <= 1 && self.tuples.iter().all(|v| v.to_bits() == 0) {
            return EncodingKind::Empty;
        }
        EncodingKind::best_for(self.rows(), width, self.distinct())
    }

    /// Build the column group.
    pub fn into_group(self) -> Result<Box<dyn ColumnGroup>> {
        let rows = self.rows();
        let kind = self.choose_encoding();
        let distinct = self.distinct();
        let group: Box<dyn ColumnGroup> = match kind {
            EncodingKind::Empty => Box::new(EmptyGroup::new(self.columns, rows)),
            EncodingKind::Const => Box::new(ConstGroup::new(self.columns, rows, self.tuples)),
            EncodingKind::Ddc => Box::new(DdcGroup::new(
                self.columns,
                self.tuples,
                CodeMap::from_codes(self.codes, distinct),
            )),
            EncodingKind::Uncompressed => {
                let width = self.columns.len();
                let mut values = Vec::with_capacity(rows * width);
                for &code in &self.codes {
                    let start = code as usize * width;
                    values.extend_from_slice(&self.tuples[start..start + width]);
                }
                Box::new(UncompressedGroup::new(self.columns, rows, values, distinct))
            }
        };
        Ok(group)
    }
}
