//! Compression factory.
//!
//! ```text
//! input ──► trivial? ──► scale factors ──► mode / workload checks
//!                                               │
//!                                               ▼
//!                                      co-coding plan (cocode)
//!                                               │
//!                              ┌────────────────┼────────────────┐
//!                              ▼                ▼                ▼
//!                        rows [0, a)      rows [a, b)      rows [b, n)   (rayon)
//!                              │                │                │
//!                              └──── merge in row-range order ───┘
//!                                               │
//!                                               ▼
//!                           CompressedMatrixBlock ──► size check
//! ```
//!
//! Every branch returns [`CompressionStatistics`]; rejections hand back the
//! input unchanged and are not errors.

use crate::cocode::{CoCodePlanner, Objective};
use crate::colgroup::TupleDictionary;
use crate::compressed::{CompressedMatrixBlock, MatrixValue};
use crate::config::CompressionSettings;
use crate::readers;
use crate::workload::WorkloadTree;
use matcomp_core::{
    ColIndexSet, ColumnGroup, CompressionMode, CompressionOutcome, CompressionStatistics,
    Error, GroupStatistics, MatrixBlock, RejectReason, Result, ScaleFactors,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use tracing::warn;

/// Smallest row range worth handing to its own worker.
pub const MIN_ROWS_PER_PARTITION: usize = 256;

/// Second operand of a compression: the quantization scale factors.
#[derive(Debug, Clone)]
pub enum QuantizationOperand {
    /// One factor for every row.
    Scalar(f64),
    /// A vector holding one factor, or one factor per row.
    Matrix(Arc<MatrixBlock>),
}

impl QuantizationOperand {
    /// Resolve to scale factors for a block of `num_rows` rows.
    pub fn scale_factors(&self, num_rows: usize) -> Result<ScaleFactors> {
        match self {
            QuantizationOperand::Scalar(s) => ScaleFactors::from_vec(vec![*s], num_rows),
            QuantizationOperand::Matrix(m) => {
                if m.rows() > 1 && m.cols() > 1 {
                    return Err(Error::shape(format!(
                        "scale factors must be a vector, got {}x{}",
                        m.rows(),
                        m.cols()
                    )));
                }
                ScaleFactors::from_vec(m.to_flat_vec(), num_rows)
            }
        }
    }
}

/// One row range of one planned group.
struct ScanTask<'p> {
    columns: &'p ColIndexSet,
    low: usize,
    high: usize,
}

/// Builds compressed blocks from matrix blocks.
#[derive(Debug, Clone, Default)]
pub struct CompressedMatrixFactory {
    settings: CompressionSettings,
}

impl CompressedMatrixFactory {
    /// Create a factory with the given settings.
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }

    /// The factory's settings.
    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    /// Workers used to encode `rows` rows for a requested thread count.
    ///
    /// Never more than the machine's cores, and never so many that a
    /// partition holds fewer than [`MIN_ROWS_PER_PARTITION`] rows (smaller
    /// inputs get one worker).
    pub fn encode_threads(&self, requested: usize, rows: usize) -> usize {
        let resolved = self.settings.resolve_threads(requested);
        let threads = resolved
            .min(num_cpus::get())
            .min(rows / MIN_ROWS_PER_PARTITION)
            .max(1);
        if threads < resolved {
            debug!(
                "Capping {} requested encode threads at {} for {} rows",
                resolved, threads, rows
            );
        }
        threads
    }

    /// Compress `input`, or hand it back unchanged when compression is
    /// rejected.
    ///
    /// # Arguments
    /// * `input` - Block to compress, never mutated
    /// * `quant` - Optional quantization scale factors
    /// * `threads` - Worker threads for encoding (0 = settings default)
    /// * `workload` - Workload model of the compression site, if any
    pub fn compress(
        &self,
        input: &Arc<MatrixBlock>,
        quant: Option<&QuantizationOperand>,
        threads: usize,
        workload: Option<&WorkloadTree>,
    ) -> Result<(MatrixValue, CompressionStatistics)> {
        let start = Instant::now();
        self.settings.validate()?;

        let mode = workload
            .and_then(WorkloadTree::site_mode)
            .unwrap_or(self.settings.mode);
        let mut stats = CompressionStatistics::new(mode, input.in_memory_size());

        if input.is_empty() {
            debug!(
                "Skipping compression of trivial {}x{} block",
                input.rows(),
                input.cols()
            );
            return Ok(reject(input, stats, RejectReason::Trivial, start));
        }

        let scales = quant
            .map(|q| q.scale_factors(input.rows()))
            .transpose()?;
        stats.quantized = scales.is_some();

        if !mode.is_enabled() {
            debug!("Compression disabled (mode {})", mode);
            return Ok(reject(input, stats, RejectReason::Disabled, start));
        }
        if let Some(tree) = workload {
            if mode.consults_workload_prediction() && !tree.is_compression_beneficial() {
                debug!("Workload predicts no benefit from compression (mode {})", mode);
                return Ok(reject(
                    input,
                    stats,
                    RejectReason::WorkloadNotBeneficial,
                    start,
                ));
            }
        }

        // Planning
        let plan_start = Instant::now();
        let objective = match workload {
            Some(tree) if mode.is_workload() => Objective::Workload(tree),
            _ => Objective::Size,
        };
        let plan = CoCodePlanner::new(input, scales.as_ref(), &self.settings)?.plan(objective)?;
        stats.estimated_size = plan.estimated_size();
        stats.planning_us = plan_start.elapsed().as_micros() as u64;

        if mode == CompressionMode::Cost {
            if let Some(tree) = workload {
                let compressed = tree.estimated_cost(&plan.summary());
                let dense = tree.uncompressed_cost(input.rows(), input.cols());
                if compressed >= dense {
                    debug!(
                        "Workload cost not improved: {:.1} compressed vs {:.1} dense",
                        compressed, dense
                    );
                    return Ok(reject(input, stats, RejectReason::CostNotImproved, start));
                }
            }
        }

        // Encoding
        let encode_start = Instant::now();
        let threads = self.encode_threads(threads, input.rows());
        stats.threads = threads;

        let ranges = partitions(input.rows(), threads);
        let tasks: Vec<ScanTask<'_>> = plan
            .groups
            .iter()
            .flat_map(|g| {
                ranges.iter().map(move |&(low, high)| ScanTask {
                    columns: &g.columns,
                    low,
                    high,
                })
            })
            .collect();
        let mut partials = scan_all(input, scales.as_ref(), &tasks, threads)?.into_iter();

        let mut groups: Vec<Box<dyn ColumnGroup>> = Vec::with_capacity(plan.groups.len());
        for planned in &plan.groups {
            let parts: Vec<TupleDictionary> = partials.by_ref().take(ranges.len()).collect();
            let dict = TupleDictionary::merge(parts, &planned.columns)?;
            debug!(
                "Encoding columns {} as {} ({} distinct, estimated {})",
                planned.columns,
                dict.choose_encoding(),
                dict.distinct(),
                planned.estimated_distinct
            );
            groups.push(dict.into_group()?);
        }
        stats.groups = groups
            .iter()
            .map(|g| GroupStatistics {
                columns: g.columns().as_slice().to_vec(),
                encoding: g.encoding(),
                distinct: g.distinct(),
                size: g.in_memory_size(),
            })
            .collect();

        let block = CompressedMatrixBlock::new(input.rows(), input.cols(), groups)?;
        stats.compressed_size = block.in_memory_size();
        stats.encoding_us = encode_start.elapsed().as_micros() as u64;

        if stats.actual_ratio() <= self.settings.min_compression_ratio {
            debug!(
                "Compressed size {} does not improve on {} bytes",
                stats.compressed_size, stats.original_size
            );
            return Ok(reject(input, stats, RejectReason::SizeNotImproved, start));
        }

        stats.outcome = CompressionOutcome::Compressed;
        stats.total_us = start.elapsed().as_micros() as u64;
        trace!("Compression statistics: {}", stats);
        Ok((MatrixValue::Compressed(Arc::new(block)), stats))
    }
}

fn reject(
    input: &Arc<MatrixBlock>,
    mut stats: CompressionStatistics,
    reason: RejectReason,
    start: Instant,
) -> (MatrixValue, CompressionStatistics) {
    stats.outcome = CompressionOutcome::Rejected(reason);
    stats.total_us = start.elapsed().as_micros() as u64;
    trace!("Compression statistics: {}", stats);
    (MatrixValue::Uncompressed(Arc::clone(input)), stats)
}

/// Split `[0, rows)` into at most `parts` contiguous non-empty ranges.
fn partitions(rows: usize, parts: usize) -> Vec<(usize, usize)> {
    let chunk = rows.div_ceil(parts.max(1)).max(1);
    (0..rows)
        .step_by(chunk)
        .map(|low| (low, (low + chunk).min(rows)))
        .collect()
}

fn scan(
    input: &MatrixBlock,
    scales: Option<&ScaleFactors>,
    task: &ScanTask<'_>,
) -> Result<TupleDictionary> {
    let mut reader = readers::create(input, task.columns, task.low, task.high, scales)?;
    TupleDictionary::scan(&mut reader)
}

fn scan_sequential(
    input: &MatrixBlock,
    scales: Option<&ScaleFactors>,
    tasks: &[ScanTask<'_>],
) -> Result<Vec<TupleDictionary>> {
    tasks.iter().map(|t| scan(input, scales, t)).collect()
}

#[cfg(feature = "parallel")]
fn scan_all(
    input: &MatrixBlock,
    scales: Option<&ScaleFactors>,
    tasks: &[ScanTask<'_>],
    threads: usize,
) -> Result<Vec<TupleDictionary>> {
    if threads <= 1 {
        return scan_sequential(input, scales, tasks);
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| {
            tasks
                .par_iter()
                .map(|t| scan(input, scales, t))
                .collect()
        }),
        Err(e) => {
            warn!("Failed to create encoding thread pool, encoding sequentially: {}", e);
            scan_sequential(input, scales, tasks)
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn scan_all(
    input: &MatrixBlock,
    scales: Option<&ScaleFactors>,
    tasks: &[ScanTask<'_>],
    _threads: usize,
) -> Result<Vec<TupleDictionary>> {
    scan_sequential(input, scales, tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{WorkloadOp, WorkloadTreeBuilder};
    use matcomp_core::EncodingKind;

    fn repeated() -> Arc<MatrixBlock> {
        Arc::new(
            MatrixBlock::from_rows(&[
                vec![1.0, 2.0],
                vec![1.0, 2.0],
                vec![3.0, 4.0],
                vec![3.0, 4.0],
            ])
            .unwrap(),
        )
    }

    fn factory(mode: CompressionMode) -> CompressedMatrixFactory {
        CompressedMatrixFactory::new(CompressionSettings::default().with_mode(mode))
    }

    fn friendly_tree() -> WorkloadTree {
        let mut builder = WorkloadTree::builder();
        builder
            .add(WorkloadTreeBuilder::ROOT, WorkloadOp::Aggregate, 1.0)
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_partitions() {
        assert_eq!(partitions(10, 3), vec![(0, 4), (4, 8), (8, 10)]);
        assert_eq!(partitions(2, 4), vec![(0, 1), (1, 2)]);
        assert_eq!(partitions(5, 1), vec![(0, 5)]);
    }

    #[test]
    fn test_encode_threads_are_capped() {
        let f = factory(CompressionMode::True);
        let cores = num_cpus::get();
        assert_eq!(f.encode_threads(1_000_000, 1500), cores.min(5));
        assert_eq!(f.encode_threads(8, 10), 1);
        assert_eq!(f.encode_threads(1, 100_000), 1);
        assert!(f.encode_threads(0, 1 << 20) <= cores);
    }

    #[test]
    fn test_huge_thread_request_is_recorded_capped() {
        let rows: Vec<Vec<f64>> = (0..1500)
            .map(|r| vec![(r % 9) as f64, (r % 4) as f64])
            .collect();
        let input = Arc::new(MatrixBlock::from_rows(&rows).unwrap());
        let (value, stats) = factory(CompressionMode::True)
            .compress(&input, None, 1_000_000, None)
            .unwrap();
        assert!(stats.is_compressed());
        assert!(stats.threads <= num_cpus::get().min(5));
        assert_eq!(value.get(1499, 0), (1499 % 9) as f64);
    }

    #[test]
    fn test_always_on_compresses_into_one_group() {
        let input = repeated();
        let (value, stats) = factory(CompressionMode::True)
            .compress(&input, None, 1, None)
            .unwrap();
        assert!(stats.is_compressed());
        assert_eq!(stats.groups.len(), 1);
        assert_eq!(stats.groups[0].encoding, EncodingKind::Ddc);
        assert_eq!(stats.compressed_size, 76);
        assert_eq!(stats.original_size, 80);

        let block = value.as_compressed().unwrap();
        assert_eq!(block.groups().len(), 1);
        assert_eq!(block.decompress().unwrap().to_flat_vec(), input.to_flat_vec());
    }

    #[test]
    fn test_trivial_input_is_returned_unchanged() {
        let input = Arc::new(MatrixBlock::zeros(0, 3));
        let (value, stats) = factory(CompressionMode::True)
            .compress(&input, None, 1, None)
            .unwrap();
        assert!(stats.is_trivial());
        assert!(Arc::ptr_eq(value.as_uncompressed().unwrap(), &input));
    }

    #[test]
    fn test_disabled_mode() {
        let input = repeated();
        let (value, stats) = factory(CompressionMode::False)
            .compress(&input, None, 1, Some(&friendly_tree()))
            .unwrap();
        assert_eq!(stats.reject_reason(), Some(RejectReason::Disabled));
        assert!(!value.is_compressed());
    }

    #[test]
    fn test_site_mode_overrides_settings() {
        let input = repeated();
        let tree = friendly_tree().with_site_mode(CompressionMode::False);
        let (_, stats) = factory(CompressionMode::True)
            .compress(&input, None, 1, Some(&tree))
            .unwrap();
        assert_eq!(stats.mode, CompressionMode::False);
        assert_eq!(stats.reject_reason(), Some(RejectReason::Disabled));
    }

    #[test]
    fn test_workload_without_benefit() {
        let input = repeated();
        let hostile = WorkloadTree::builder().op(WorkloadOp::Indexing).build();
        let (_, stats) = factory(CompressionMode::Auto)
            .compress(&input, None, 1, Some(&hostile))
            .unwrap();
        assert_eq!(stats.reject_reason(), Some(RejectReason::WorkloadNotBeneficial));

        // Always-on ignores the prediction.
        let (_, stats) = factory(CompressionMode::True)
            .compress(&input, None, 1, Some(&hostile))
            .unwrap();
        assert!(stats.is_compressed());
    }

    #[test]
    fn test_cost_mode_rejects_small_inputs() {
        let input = repeated();
        let (_, stats) = factory(CompressionMode::Cost)
            .compress(&input, None, 1, Some(&friendly_tree()))
            .unwrap();
        assert_eq!(stats.reject_reason(), Some(RejectReason::CostNotImproved));
        assert!(stats.estimated_size > 0);
        assert_eq!(stats.compressed_size, 0);
    }

    #[test]
    fn test_incompressible_input_falls_back() {
        let input = Arc::new(
            MatrixBlock::from_rows(&[
                vec![1.0, 5.0],
                vec![2.0, 6.0],
                vec![3.0, 7.0],
                vec![4.0, 8.0],
            ])
            .unwrap(),
        );
        let (value, stats) = factory(CompressionMode::True)
            .compress(&input, None, 1, None)
            .unwrap();
        assert_eq!(stats.reject_reason(), Some(RejectReason::SizeNotImproved));
        assert!(stats.compressed_size > stats.original_size);
        assert!(Arc::ptr_eq(value.as_uncompressed().unwrap(), &input));
    }

    #[test]
    fn test_quantized_scalar_operand() {
        let input = repeated();
        let quant = QuantizationOperand::Scalar(0.5);
        let (value, stats) = factory(CompressionMode::True)
            .compress(&input, Some(&quant), 2, None)
            .unwrap();
        assert!(stats.quantized);
        let block = value.as_compressed().unwrap().decompress().unwrap();
        assert_eq!(block.to_flat_vec(), vec![0.0, 1.0, 0.0, 1.0, 1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_scale_factor_length_mismatch() {
        let input = repeated();
        let quant = QuantizationOperand::Matrix(Arc::new(
            MatrixBlock::dense(3, 1, vec![1.0, 2.0, 3.0]).unwrap(),
        ));
        let err = factory(CompressionMode::True)
            .compress(&input, Some(&quant), 1, None)
            .unwrap_err();
        assert!(matches!(err, Error::ScaleFactorLength { actual: 3, num_rows: 4 }));
    }

    #[test]
    fn test_per_row_operand() {
        let input = repeated();
        let quant = QuantizationOperand::Matrix(Arc::new(
            MatrixBlock::dense(4, 1, vec![1.0, 1.0, 0.5, 0.5]).unwrap(),
        ));
        let scales = quant.scale_factors(4).unwrap();
        assert_eq!(scales.for_row(2), 0.5);
        let (value, _) = factory(CompressionMode::True)
            .compress(&input, Some(&quant), 1, None)
            .unwrap();
        assert_eq!(value.get(2, 1), 2.0);
        assert_eq!(value.get(0, 1), 2.0);
    }

    #[test]
    fn test_output_independent_of_threads() {
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|r| vec![(r % 7) as f64, (r % 7) as f64 * 2.0, (r % 3) as f64])
            .collect();
        let input = Arc::new(MatrixBlock::from_rows(&rows).unwrap());
        let f = factory(CompressionMode::True);
        let (reference, ref_stats) = f.compress(&input, None, 1, None).unwrap();
        for threads in [2, 4] {
            let (value, stats) = f.compress(&input, None, threads, None).unwrap();
            assert_eq!(stats.groups, ref_stats.groups);
            for r in 0..200 {
                for c in 0..3 {
                    assert_eq!(value.get(r, c), reference.get(r, c));
                }
            }
        }
    }
}
