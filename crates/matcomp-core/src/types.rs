//! Core type definitions for compression decisions.

use serde::{Deserialize, Serialize};

/// Compression policy of a compression site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionMode {
    /// Always attempt compression.
    True,
    /// Never compress.
    False,
    /// Compress when the workload cost of the planned encoding beats the dense cost.
    Cost,
    /// Compress when the workload predicts a benefit and the size improves.
    #[default]
    Auto,
    /// Plan column groups against the workload cost instead of the size.
    Workload,
}

impl CompressionMode {
    /// Whether compression may be attempted at all.
    pub fn is_enabled(self) -> bool {
        self != CompressionMode::False
    }

    /// Whether planning is driven by the workload model.
    pub fn is_workload(self) -> bool {
        self == CompressionMode::Workload
    }

    /// Whether a workload predicting no benefit rejects compression.
    pub fn consults_workload_prediction(self) -> bool {
        matches!(self, CompressionMode::Cost | CompressionMode::Auto)
    }

    /// Parse from string (returns None on failure)
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl std::str::FromStr for CompressionMode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRUE" | "ON" => Ok(CompressionMode::True),
            "FALSE" | "OFF" => Ok(CompressionMode::False),
            "COST" => Ok(CompressionMode::Cost),
            "AUTO" => Ok(CompressionMode::Auto),
            "WORKLOAD" => Ok(CompressionMode::Workload),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMode::True => write!(f, "TRUE"),
            CompressionMode::False => write!(f, "FALSE"),
            CompressionMode::Cost => write!(f, "COST"),
            CompressionMode::Auto => write!(f, "AUTO"),
            CompressionMode::Workload => write!(f, "WORKLOAD"),
        }
    }
}

/// Physical layout of a matrix block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// Row-major dense values.
    Dense,
    /// Compressed sparse rows.
    Sparse,
    /// Dense raw values with scale factors applied on read.
    Quantized,
}

/// Bytes of bookkeeping charged to every column group.
pub const GROUP_HEADER_BYTES: usize = 16;

/// Encoding scheme of a column group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingKind {
    /// Every value is zero.
    Empty,
    /// Every row holds the same tuple.
    Const,
    /// Dense dictionary coding: distinct tuples plus one code per row.
    Ddc,
    /// Raw values of the group's columns.
    Uncompressed,
}

impl EncodingKind {
    /// Get encoding name as string.
    pub fn name(self) -> &'static str {
        match self {
            EncodingKind::Empty => "empty",
            EncodingKind::Const => "const",
            EncodingKind::Ddc => "ddc",
            EncodingKind::Uncompressed => "uncompressed",
        }
    }

    /// Estimate the in-memory size of a group before it is built.
    ///
    /// # Arguments
    /// * `rows` - Number of rows in the group
    /// * `width` - Number of columns in the group
    /// * `distinct` - Number of distinct row tuples
    pub fn estimate_size(self, rows: usize, width: usize, distinct: usize) -> usize {
        let header = GROUP_HEADER_BYTES + width * 4;
        match self {
            EncodingKind::Empty => header,
            EncodingKind::Const => header + width * 8,
            EncodingKind::Ddc => header + distinct * width * 8 + rows * code_width(distinct),
            EncodingKind::Uncompressed => header + rows * width * 8,
        }
    }

    /// Cheapest encoding for the given counts, ignoring the all-zero case.
    pub fn best_for(rows: usize, width: usize, distinct: usize) -> EncodingKind {
        if distinct <= 1 {
            return EncodingKind::Const;
        }
        let ddc = EncodingKind::Ddc.estimate_size(rows, width, distinct);
        let raw = EncodingKind::Uncompressed.estimate_size(rows, width, distinct);
        if ddc < raw {
            EncodingKind::Ddc
        } else {
            EncodingKind::Uncompressed
        }
    }
}

impl std::fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bytes needed per row code for a dictionary of `distinct` entries.
pub fn code_width(distinct: usize) -> usize {
    if distinct <= 1 << 8 {
        1
    } else if distinct <= 1 << 16 {
        2
    } else {
        4
    }
}
