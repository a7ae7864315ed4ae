//! # matcomp core
//!
//! Core types for column-group matrix compression.
//!
//! ## Core Types
//!
//! - [`MatrixBlock`] - Dense, sparse, or quantized numeric block
//! - [`ColIndexSet`] - Ordered column selection
//! - [`ScaleFactors`] - Global or per-row quantization factors
//! - [`CompressionMode`] - Compression policy of a site
//! - [`CompressionStatistics`] - Record of one compression decision
//! - [`ColumnGroup`] - Contract every column-group encoder satisfies

pub mod colindex;
pub mod error;
pub mod matrix;
pub mod stats;
pub mod traits;
pub mod types;

pub use colindex::ColIndexSet;
pub use error::{Error, Result};
pub use matrix::{BlockData, CsrData, MatrixBlock, ScaleFactors, BLOCK_HEADER_BYTES};
pub use stats::{CompressionOutcome, CompressionStatistics, GroupStatistics, RejectReason};
pub use traits::ColumnGroup;
pub use types::{code_width, CompressionMode, EncodingKind, Layout, GROUP_HEADER_BYTES};
