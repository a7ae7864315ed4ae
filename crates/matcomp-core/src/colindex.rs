//! Ordered column selections.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An ordered, duplicate-free set of column positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColIndexSet {
    indices: Vec<u32>,
}

impl ColIndexSet {
    /// Create from arbitrary indices. Input is sorted; duplicates are rejected.
    pub fn new(mut indices: Vec<u32>) -> Result<Self> {
        indices.sort_unstable();
        if let Some(w) = indices.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::DuplicateColumn(w[0] as usize));
        }
        Ok(Self { indices })
    }

    /// All columns in `[low, high)`.
    pub fn range(low: u32, high: u32) -> Self {
        Self {
            indices: (low..high).collect(),
        }
    }

    /// A single column.
    pub fn single(index: u32) -> Self {
        Self {
            indices: vec![index],
        }
    }

    /// Number of selected columns.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Column at a position within the selection.
    pub fn get(&self, position: usize) -> Option<u32> {
        self.indices.get(position).copied()
    }

    /// Position of a column within the selection.
    pub fn position_of(&self, column: u32) -> Option<usize> {
        self.indices.binary_search(&column).ok()
    }

    /// Selected columns in ascending order.
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    /// Iterate over selected columns.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices.iter().copied()
    }

    /// Largest selected column.
    pub fn max(&self) -> Option<u32> {
        self.indices.last().copied()
    }

    /// Check every index against a column count.
    pub fn validate(&self, num_cols: usize) -> Result<()> {
        match self.max() {
            Some(max) if max as usize >= num_cols => Err(Error::ColumnOutOfRange {
                index: max as usize,
                num_cols,
            }),
            _ => Ok(()),
        }
    }

    /// Union of two disjoint selections.
    pub fn combine(&self, other: &ColIndexSet) -> Result<ColIndexSet> {
        let mut merged = Vec::with_capacity(self.len() + other.len());
        merged.extend_from_slice(&self.indices);
        merged.extend_from_slice(&other.indices);
        ColIndexSet::new(merged)
    }

    /// Whether the two selections share no column.
    pub fn is_disjoint(&self, other: &ColIndexSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return false,
            }
        }
        true
    }
}

impl std::fmt::Display for ColIndexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_and_rejects_duplicates() {
        let set = ColIndexSet::new(vec![3, 0, 2]).unwrap();
        assert_eq!(set.as_slice(), &[0, 2, 3]);
        assert_eq!(set.position_of(2), Some(1));
        assert_eq!(set.position_of(1), None);

        assert!(matches!(
            ColIndexSet::new(vec![1, 4, 1]),
            Err(Error::DuplicateColumn(1))
        ));
    }

    #[test]
    fn test_validate() {
        let set = ColIndexSet::range(0, 4);
        assert!(set.validate(4).is_ok());
        assert!(matches!(
            set.validate(3),
            Err(Error::ColumnOutOfRange { index: 3, num_cols: 3 })
        ));
    }

    #[test]
    fn test_combine_and_disjoint() {
        let a = ColIndexSet::new(vec![0, 5]).unwrap();
        let b = ColIndexSet::new(vec![2]).unwrap();
        assert!(a.is_disjoint(&b));
        let c = a.combine(&b).unwrap();
        assert_eq!(c.as_slice(), &[0, 2, 5]);
        assert!(!c.is_disjoint(&a));
        assert!(a.combine(&c).is_err());
    }
}
