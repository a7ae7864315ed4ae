// Explicit row/column indexing reads better in the encoders and readers
#![allow(clippy::needless_range_loop)]

//! # matcomp
//!
//! Workload-aware column-group compression for matrix blocks, with optional
//! quantization applied while values are read.
//!
//! ## Quick Start
//!
//! ```ignore
//! use matcomp::prelude::*;
//! use std::sync::Arc;
//!
//! let block = Arc::new(MatrixBlock::from_rows(&[
//!     vec![1.0, 2.0],
//!     vec![1.0, 2.0],
//!     vec![3.0, 4.0],
//!     vec![3.0, 4.0],
//! ])?);
//!
//! let factory = CompressedMatrixFactory::new(
//!     CompressionSettings::default().with_mode(CompressionMode::True),
//! );
//! let (value, stats) = factory.compress(&block, None, 0, None)?;
//! assert!(stats.is_compressed());
//! assert_eq!(value.get(2, 1), 4.0);
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! FlooredCompressionLop ──► descriptor ──► QuantizedCompressionInstruction
//!                                                   │
//!                        WorkloadRegistry ◄─ lookup ┤
//!                                                   ▼
//!                                       CompressedMatrixFactory
//!                                                   │
//!                   readers ──► cocode ──► colgroup ┴─► CompressedMatrixBlock
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`readers`] | Column-selecting row readers (dense, sparse, quantized) |
//! | [`workload`] | Workload tree and cost model |
//! | [`registry`] | Keyed store bridging compile time and run time |
//! | [`cocode`] | Column grouping planner |
//! | [`colgroup`] | Column-group encoders |
//! | [`factory`] | Compression decision and encoding |
//! | [`instruction`] | Instruction emission, parsing and execution |
//!
//! ## Feature Flags
//!
//! - `parallel` - Encode row partitions on a rayon pool (default)

pub mod cocode;
pub mod colgroup;
pub mod compressed;
pub mod config;
pub mod factory;
pub mod instruction;
pub mod readers;
pub mod registry;
pub mod workload;

pub use matcomp_core::*;

pub use cocode::{CoCodePlanner, CoCodingPlan, Objective, PlannedGroup, Sample};
pub use compressed::{CompressedMatrixBlock, MatrixValue};
pub use config::CompressionSettings;
pub use factory::{CompressedMatrixFactory, QuantizationOperand, MIN_ROWS_PER_PARTITION};
pub use instruction::{
    DataType, ExecType, ExecutionContext, FlooredCompressionLop, FunctionCallProducer,
    InstructionType, LocalExecutionContext, Operand, Producer, QuantizedCompressionInstruction,
    ValueType, VariableProducer,
};
pub use readers::RowReader;
pub use registry::{RegistryKey, SingletonRegistry, WorkloadRegistry};
pub use workload::{EncodingSummary, NodeSpec, WorkloadOp, WorkloadTree, WorkloadTreeBuilder};

/// Commonly used types.
pub mod prelude {
    pub use crate::compressed::{CompressedMatrixBlock, MatrixValue};
    pub use crate::config::CompressionSettings;
    pub use crate::factory::{CompressedMatrixFactory, QuantizationOperand};
    pub use crate::instruction::{
        ExecutionContext, FlooredCompressionLop, LocalExecutionContext, Operand,
        QuantizedCompressionInstruction,
    };
    pub use crate::registry::{RegistryKey, WorkloadRegistry};
    pub use crate::workload::{WorkloadOp, WorkloadTree};
    pub use matcomp_core::{
        ColIndexSet, CompressionMode, CompressionStatistics, Error, MatrixBlock, Result,
        ScaleFactors,
    };
}
