//! Statistics for compression decisions.

use crate::types::{CompressionMode, EncodingKind};
use serde::{Deserialize, Serialize};

/// Why compression was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Input has zero rows or zero columns; nothing was attempted.
    Trivial,
    /// Compression is switched off for this site.
    Disabled,
    /// The workload model predicts no benefit from compression.
    WorkloadNotBeneficial,
    /// The planned encoding is not cheaper under the workload model.
    CostNotImproved,
    /// The assembled artifact is not smaller than the input.
    SizeNotImproved,
}

impl RejectReason {
    /// Get reason as string.
    pub fn name(self) -> &'static str {
        match self {
            RejectReason::Trivial => "trivial",
            RejectReason::Disabled => "disabled",
            RejectReason::WorkloadNotBeneficial => "workload_not_beneficial",
            RejectReason::CostNotImproved => "cost_not_improved",
            RejectReason::SizeNotImproved => "size_not_improved",
        }
    }
}

/// Result of a compression attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionOutcome {
    /// A compressed artifact replaced the input.
    Compressed,
    /// The input was returned unchanged.
    Rejected(RejectReason),
}

/// Per-group encoding record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    /// Columns covered by the group.
    pub columns: Vec<u32>,
    /// Chosen encoding.
    pub encoding: EncodingKind,
    /// Distinct row tuples observed.
    pub distinct: usize,
    /// In-memory size of the encoded group in bytes.
    pub size: usize,
}

/// Statistics of one compression call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionStatistics {
    /// Mode the decision was made under.
    pub mode: CompressionMode,
    /// Outcome of the call.
    pub outcome: CompressionOutcome,
    /// Size of the input block in bytes.
    pub original_size: usize,
    /// Planned compressed size in bytes (from sampled estimates).
    pub estimated_size: usize,
    /// Actual compressed size in bytes (0 when nothing was encoded).
    pub compressed_size: usize,
    /// Per-group encodings.
    pub groups: Vec<GroupStatistics>,
    /// Whether values were quantized while reading.
    pub quantized: bool,
    /// Worker threads used for encoding.
    pub threads: usize,
    /// Time spent planning column groups, in microseconds.
    pub planning_us: u64,
    /// Time spent encoding column groups, in microseconds.
    pub encoding_us: u64,
    /// Total time in microseconds.
    pub total_us: u64,
}

impl CompressionStatistics {
    /// Create stats for a call that has not encoded anything yet.
    pub fn new(mode: CompressionMode, original_size: usize) -> Self {
        Self {
            mode,
            outcome: CompressionOutcome::Rejected(RejectReason::Trivial),
            original_size,
            estimated_size: 0,
            compressed_size: 0,
            groups: Vec::new(),
            quantized: false,
            threads: 1,
            planning_us: 0,
            encoding_us: 0,
            total_us: 0,
        }
    }

    /// Create stats for a rejected call.
    pub fn rejected(mode: CompressionMode, original_size: usize, reason: RejectReason) -> Self {
        let mut stats = Self::new(mode, original_size);
        stats.outcome = CompressionOutcome::Rejected(reason);
        stats
    }

    /// Whether the input was replaced by a compressed artifact.
    pub fn is_compressed(&self) -> bool {
        self.outcome == CompressionOutcome::Compressed
    }

    /// Rejection reason, if any.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self.outcome {
            CompressionOutcome::Rejected(reason) => Some(reason),
            CompressionOutcome::Compressed => None,
        }
    }

    /// Whether the input was trivial and nothing was attempted.
    pub fn is_trivial(&self) -> bool {
        self.reject_reason() == Some(RejectReason::Trivial)
    }

    /// Planned ratio (original / estimated).
    pub fn estimated_ratio(&self) -> f64 {
        ratio(self.original_size, self.estimated_size)
    }

    /// Achieved ratio (original / compressed). Higher is better.
    pub fn actual_ratio(&self) -> f64 {
        ratio(self.original_size, self.compressed_size)
    }
}

fn ratio(original: usize, compressed: usize) -> f64 {
    if compressed == 0 {
        return 0.0;
    }
    original as f64 / compressed as f64
}

impl std::fmt::Display for CompressionStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = match self.outcome {
            CompressionOutcome::Compressed => "compressed".to_string(),
            CompressionOutcome::Rejected(reason) => format!("rejected({})", reason.name()),
        };
        write!(
            f,
            "mode: {}, outcome: {}, size: {} -> {} (est {}, ratio {:.2}x, est {:.2}x), groups: {}, threads: {}, quantized: {}, time: plan {}us / encode {}us / total {}us",
            self.mode,
            outcome,
            self.original_size,
            self.compressed_size,
            self.estimated_size,
            self.actual_ratio(),
            self.estimated_ratio(),
            self.groups.len(),
            self.threads,
            self.quantized,
            self.planning_us,
            self.encoding_us,
            self.total_us,
        )
    }
}
