//! Cost estimates of a workload against dense and compressed matrices.
//!
//! Costs are in abstract cell operations. Dense costs scale with
//! `rows * cols`; compressed costs mostly scale with the dictionary
//! (`distinct * width`) plus one pass over the row codes.

use super::tree::{WorkloadOp, WorkloadTree};
use serde::{Deserialize, Serialize};

/// Fixed cost charged per column group and operation.
const GROUP_OVERHEAD: f64 = 64.0;

/// Shape of one planned column group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Number of columns.
    pub width: usize,
    /// Estimated distinct tuples.
    pub distinct: usize,
}

/// Shape of a candidate encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSummary {
    /// Row count of the matrix.
    pub rows: usize,
    /// Planned groups.
    pub groups: Vec<GroupSummary>,
}

impl EncodingSummary {
    /// Summary of a single group.
    pub fn single(rows: usize, width: usize, distinct: usize) -> Self {
        Self {
            rows,
            groups: vec![GroupSummary { width, distinct }],
        }
    }
}

/// Cost of one op against a dense `rows x cols` matrix.
pub fn dense_op_cost(op: WorkloadOp, rows: usize, cols: usize) -> f64 {
    let cells = rows as f64 * cols as f64;
    match op {
        WorkloadOp::Root | WorkloadOp::Decompress => 0.0,
        WorkloadOp::LeftMatMult { rows: k } => k as f64 * cells,
        WorkloadOp::RightMatMult { cols: k } => k as f64 * cells,
        WorkloadOp::Aggregate
        | WorkloadOp::ScalarElementwise
        | WorkloadOp::Indexing
        | WorkloadOp::Transpose => cells,
    }
}

/// Cost of one op against a single compressed group.
pub fn group_op_cost(op: WorkloadOp, rows: usize, group: GroupSummary) -> f64 {
    let n = rows as f64;
    let dict = group.distinct.max(1) as f64 * group.width as f64;
    let cells = n * group.width as f64;
    let cost = match op {
        WorkloadOp::Root => return 0.0,
        WorkloadOp::LeftMatMult { rows: k } => k as f64 * (n + dict),
        WorkloadOp::RightMatMult { cols: k } => k as f64 * (dict + n),
        WorkloadOp::Aggregate => n + dict,
        WorkloadOp::ScalarElementwise => dict,
        WorkloadOp::Decompress | WorkloadOp::Indexing => cells,
        WorkloadOp::Transpose => 2.0 * cells,
    };
    cost + GROUP_OVERHEAD
}

impl WorkloadTree {
    /// Static prediction of whether compression pays off for this workload.
    ///
    /// True when frequency-weighted compression-friendly operations outweigh
    /// operations that force decompression.
    pub fn is_compression_beneficial(&self) -> bool {
        let mut friendly = 0.0;
        let mut hostile = 0.0;
        self.for_each_weighted(|node, weight| {
            if node.op.is_compression_friendly() {
                friendly += weight;
            } else if node.op.forces_decompression() {
                hostile += weight;
            }
        });
        friendly > 0.0 && friendly > hostile
    }

    /// Cost of executing the workload against the dense matrix.
    pub fn uncompressed_cost(&self, rows: usize, cols: usize) -> f64 {
        let mut total = 0.0;
        self.for_each_weighted(|node, weight| {
            total += weight * dense_op_cost(node.op, rows, cols);
        });
        total
    }

    /// Cost of executing the workload against a candidate encoding.
    pub fn estimated_cost(&self, summary: &EncodingSummary) -> f64 {
        let mut total = 0.0;
        self.for_each_weighted(|node, weight| {
            let op_cost: f64 = summary
                .groups
                .iter()
                .map(|&g| group_op_cost(node.op, summary.rows, g))
                .sum();
            total += weight * op_cost;
        });
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkloadTreeBuilder;

    fn matmult_loop() -> WorkloadTree {
        let mut builder = WorkloadTree::builder();
        let body = builder
            .add(WorkloadTreeBuilder::ROOT, WorkloadOp::Root, 100.0)
            .unwrap();
        builder
            .add(body, WorkloadOp::RightMatMult { cols: 1 }, 1.0)
            .unwrap();
        builder.add(body, WorkloadOp::Aggregate, 1.0).unwrap();
        builder.build()
    }

    #[test]
    fn test_prediction() {
        assert!(matmult_loop().is_compression_beneficial());

        let hostile = WorkloadTree::builder()
            .op(WorkloadOp::Aggregate)
            .op(WorkloadOp::Indexing)
            .op(WorkloadOp::Decompress)
            .build();
        assert!(!hostile.is_compression_beneficial());

        let empty = WorkloadTree::builder().build();
        assert!(!empty.is_compression_beneficial());
    }

    #[test]
    fn test_low_cardinality_is_cheaper_than_dense() {
        let tree = matmult_loop();
        let rows = 10_000;
        let dense = tree.uncompressed_cost(rows, 4);
        let compressed = tree.estimated_cost(&EncodingSummary::single(rows, 4, 8));
        assert!(compressed < dense);
    }

    #[test]
    fn test_high_cardinality_groups_cost_more() {
        let tree = matmult_loop();
        let low = tree.estimated_cost(&EncodingSummary::single(1000, 2, 4));
        let high = tree.estimated_cost(&EncodingSummary::single(1000, 2, 1000));
        assert!(low < high);
    }

    #[test]
    fn test_decompress_has_no_dense_cost() {
        assert_eq!(dense_op_cost(WorkloadOp::Decompress, 10, 10), 0.0);
        let g = GroupSummary {
            width: 10,
            distinct: 3,
        };
        assert!(group_op_cost(WorkloadOp::Decompress, 10, g) >= 100.0);
    }
}
