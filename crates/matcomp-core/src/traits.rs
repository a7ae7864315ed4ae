//! The column-group encoding contract.
//!
//! ## Contract
//!
//! ```text
//! collected row tuples ──▶ encoder ──▶ ColumnGroup
//!                            │              │
//!             EncodingKind::estimate_size   ├─ get(row, position)
//!             (before construction)         ├─ decode_row_into(row, out)
//!                                           └─ in_memory_size()
//! ```

use crate::colindex::ColIndexSet;
use crate::types::EncodingKind;

/// An encoded subset of a matrix's columns.
///
/// Every implementation must reconstruct any single row of its columns
/// without decoding the whole group.
pub trait ColumnGroup: std::fmt::Debug + Send + Sync {
    /// Columns covered by this group.
    fn columns(&self) -> &ColIndexSet;

    /// Encoding scheme of this group.
    fn encoding(&self) -> EncodingKind;

    /// Number of encoded rows.
    fn num_rows(&self) -> usize;

    /// Number of distinct row tuples held by the group.
    fn distinct(&self) -> usize;

    /// Value of a row at a position within [`ColumnGroup::columns`].
    fn get(&self, row: usize, position: usize) -> f64;

    /// Write one row's values into a full-width output row.
    ///
    /// # Arguments
    /// * `row` - Row to reconstruct
    /// * `out` - Output row indexed by absolute column
    fn decode_row_into(&self, row: usize, out: &mut [f64]) {
        for (pos, col) in self.columns().iter().enumerate() {
            out[col as usize] = self.get(row, pos);
        }
    }

    /// In-memory size of the encoded group in bytes.
    fn in_memory_size(&self) -> usize;
}
