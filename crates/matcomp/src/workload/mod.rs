//! Workload model: what will run against the compressed matrix.
//!
//! The compiler walks the operations downstream of a compression site and
//! records them as a tree. Loop bodies become subtrees whose `frequency` is
//! the trip count, so an op inside a 100-iteration loop weighs 100 times as
//! much as an op executed once.
//!
//! ```text
//!  Root
//!   ├── Aggregate            (x1)
//!   └── Root (loop body)     (x100)
//!        ├── RightMatMult    (x1)  → effective weight 100
//!        └── ScalarElementwise
//! ```

mod cost;
mod tree;

pub use cost::{dense_op_cost, group_op_cost, EncodingSummary, GroupSummary};
pub use tree::{NodeSpec, WorkloadNode, WorkloadOp, WorkloadTree, WorkloadTreeBuilder};
