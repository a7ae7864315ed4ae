//! Row-to-dictionary code maps sized to the dictionary.

use matcomp_core::code_width;

/// Per-row dictionary codes, stored in the narrowest integer that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeMap {
    /// Up to 256 dictionary entries.
    U8(Vec<u8>),
    /// Up to 65536 dictionary entries.
    U16(Vec<u16>),
    /// Anything larger.
    U32(Vec<u32>),
}

impl CodeMap {
    /// Narrow `codes` for a dictionary of `distinct` entries.
    pub fn from_codes(codes: Vec<u32>, distinct: usize) -> Self {
        match code_width(distinct) {
            1 => CodeMap::U8(codes.into_iter().map(|c| c as u8).collect()),
            2 => CodeMap::U16(codes.into_iter().map(|c| c as u16).collect()),
            _ => CodeMap::U32(codes),
        }
    }

    /// Code of a row.
    #[inline]
    pub fn get(&self, row: usize) -> usize {
        match self {
            CodeMap::U8(v) => v[row] as usize,
            CodeMap::U16(v) => v[row] as usize,
            CodeMap::U32(v) => v[row] as usize,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            CodeMap::U8(v) => v.len(),
            CodeMap::U16(v) => v.len(),
            CodeMap::U32(v) => v.len(),
        }
    }

    /// Whether the map holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per stored code.
    pub fn code_bytes(&self) -> usize {
        match self {
            CodeMap::U8(_) => 1,
            CodeMap::U16(_) => 2,
            CodeMap::U32(_) => 4,
        }
    }

    /// In-memory size of the codes in bytes.
    pub fn in_memory_size(&self) -> usize {
        self.len() * self.code_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing() {
        let map = CodeMap::from_codes(vec![0, 1, 1, 0], 2);
        assert!(matches!(map, CodeMap::U8(_)));
        assert_eq!(map.get(2), 1);
        assert_eq!(map.in_memory_size(), 4);

        let map = CodeMap::from_codes(vec![300, 2], 301);
        assert!(matches!(map, CodeMap::U16(_)));
        assert_eq!(map.get(0), 300);

        let map = CodeMap::from_codes(vec![70_000], 70_001);
        assert_eq!(map.code_bytes(), 4);
        assert_eq!(map.get(0), 70_000);
    }
}
