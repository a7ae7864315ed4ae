//! Column co-coding planner.
//!
//! Decides which columns are encoded together before any encoder runs.
//!
//! ```text
//! block ──► stride sample ──► per-column distinct estimates
//!                                   │
//!                                   ▼
//!               greedy pairwise merge (largest saving first)
//!                                   │
//!                                   ▼
//!                        CoCodingPlan { groups }
//! ```
//!
//! The plan depends only on the block contents, the column order, and the
//! settings, so compressing the same block twice yields the same groups.

use crate::config::CompressionSettings;
use crate::readers;
use crate::workload::{EncodingSummary, GroupSummary, WorkloadTree};
use matcomp_core::{
    ColIndexSet, EncodingKind, MatrixBlock, Result, ScaleFactors, BLOCK_HEADER_BYTES,
};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::debug;

/// What the planner minimises.
#[derive(Debug, Clone, Copy)]
pub enum Objective<'w> {
    /// Estimated in-memory size in bytes.
    Size,
    /// Estimated cost of running the workload against the encoding.
    Workload(&'w WorkloadTree),
}

/// One planned column group.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedGroup {
    /// Columns encoded together.
    pub columns: ColIndexSet,
    /// Estimated distinct tuples over all rows.
    pub estimated_distinct: usize,
}

impl PlannedGroup {
    /// Encoding the estimate points to.
    pub fn estimated_encoding(&self, rows: usize) -> EncodingKind {
        EncodingKind::best_for(rows, self.columns.len(), self.estimated_distinct)
    }

    /// Estimated in-memory size in bytes.
    pub fn estimated_size(&self, rows: usize) -> usize {
        self.estimated_encoding(rows)
            .estimate_size(rows, self.columns.len(), self.estimated_distinct)
    }
}

/// Column groups chosen for a block.
#[derive(Debug, Clone, PartialEq)]
pub struct CoCodingPlan {
    /// Row count of the planned block.
    pub rows: usize,
    /// Groups ordered by their first column.
    pub groups: Vec<PlannedGroup>,
    /// Rows the estimates were computed on.
    pub sampled_rows: usize,
}

impl CoCodingPlan {
    /// Estimated size of the compressed block in bytes.
    pub fn estimated_size(&self) -> usize {
        BLOCK_HEADER_BYTES
            + self
                .groups
                .iter()
                .map(|g| g.estimated_size(self.rows))
                .sum::<usize>()
    }

    /// Shape summary for workload costing.
    pub fn summary(&self) -> EncodingSummary {
        EncodingSummary {
            rows: self.rows,
            groups: self
                .groups
                .iter()
                .map(|g| GroupSummary {
                    width: g.columns.len(),
                    distinct: g.estimated_distinct,
                })
                .collect(),
        }
    }
}

/// Row sample of every column, row-major.
#[derive(Debug, Clone)]
pub struct Sample {
    total_rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Sample {
    /// Draw a deterministic stride sample of `block`.
    ///
    /// Row `i` of the sample is source row `i * rows / size`. Inputs no larger
    /// than the sample size are read whole.
    pub fn draw(
        block: &MatrixBlock,
        scales: Option<&ScaleFactors>,
        settings: &CompressionSettings,
    ) -> Result<Self> {
        let rows = block.rows();
        let cols = block.cols();
        let all = ColIndexSet::range(0, cols as u32);
        let size = sample_size(rows, settings);

        let mut values = Vec::with_capacity(size * cols);
        if size == rows {
            let mut reader = readers::create(block, &all, 0, rows, scales)?;
            while let Some(tuple) = reader.next_row() {
                values.extend_from_slice(tuple);
            }
        } else {
            for i in 0..size {
                let row = i * rows / size;
                let mut reader = readers::create(block, &all, row, row + 1, scales)?;
                if let Some(tuple) = reader.next_row() {
                    values.extend_from_slice(tuple);
                }
            }
        }

        Ok(Self {
            total_rows: rows,
            cols,
            values,
        })
    }

    /// Number of sampled rows.
    pub fn len(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.values.len() / self.cols
        }
    }

    /// Whether no rows were sampled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every source row is in the sample.
    pub fn is_exhaustive(&self) -> bool {
        self.len() == self.total_rows
    }

    /// Estimate the distinct tuples of `columns` over all source rows.
    ///
    /// Exact when the sample is exhaustive. Otherwise the sampled count is
    /// extrapolated by the share of tuples seen exactly once,
    /// `d + f1 * (n - s) / s`, capped at `n`.
    pub fn estimate_distinct(&self, columns: &ColIndexSet) -> usize {
        let s = self.len();
        if s == 0 {
            return 0;
        }
        let mut counts: HashMap<SmallVec<[u64; 4]>, usize> = HashMap::new();
        for row in self.values.chunks_exact(self.cols) {
            let key = columns.iter().map(|c| row[c as usize].to_bits()).collect();
            *counts.entry(key).or_insert(0) += 1;
        }
        let d = counts.len();
        if self.is_exhaustive() {
            return d;
        }
        let f1 = counts.values().filter(|&&c| c == 1).count();
        let n = self.total_rows;
        let extrapolated = d as f64 + f1 as f64 * (n - s) as f64 / s as f64;
        (extrapolated.round() as usize).clamp(d, n)
    }
}

fn sample_size(rows: usize, settings: &CompressionSettings) -> usize {
    let by_ratio = (rows as f64 * settings.sample_ratio).ceil() as usize;
    by_ratio.max(settings.min_sample_size).min(rows)
}

/// Greedy co-coding planner.
pub struct CoCodePlanner<'a> {
    settings: &'a CompressionSettings,
    sample: Sample,
    rows: usize,
    distinct_cache: HashMap<Vec<u32>, usize>,
}

impl<'a> CoCodePlanner<'a> {
    /// Sample `block` and prepare a planner.
    pub fn new(
        block: &MatrixBlock,
        scales: Option<&ScaleFactors>,
        settings: &'a CompressionSettings,
    ) -> Result<Self> {
        Ok(Self {
            settings,
            sample: Sample::draw(block, scales, settings)?,
            rows: block.rows(),
            distinct_cache: HashMap::new(),
        })
    }

    /// The drawn sample.
    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    fn distinct(&mut self, columns: &ColIndexSet) -> usize {
        if let Some(&d) = self.distinct_cache.get(columns.as_slice()) {
            return d;
        }
        let d = self.sample.estimate_distinct(columns);
        self.distinct_cache.insert(columns.as_slice().to_vec(), d);
        d
    }

    fn cost(&self, objective: Objective<'_>, group: &PlannedGroup) -> f64 {
        match objective {
            Objective::Size => group.estimated_size(self.rows) as f64,
            Objective::Workload(tree) => tree.estimated_cost(&EncodingSummary::single(
                self.rows,
                group.columns.len(),
                group.estimated_distinct,
            )),
        }
    }

    /// Plan the column groups of the block.
    pub fn plan(mut self, objective: Objective<'_>) -> Result<CoCodingPlan> {
        let cols = self.sample.cols as u32;
        let mut groups = Vec::with_capacity(cols as usize);
        for c in 0..cols {
            let columns = ColIndexSet::single(c);
            let estimated_distinct = self.distinct(&columns);
            groups.push(PlannedGroup {
                columns,
                estimated_distinct,
            });
        }

        let max_width = self.settings.max_group_width;
        loop {
            let mut best: Option<(usize, usize, f64, PlannedGroup)> = None;
            for i in 0..groups.len() {
                for j in (i + 1)..groups.len() {
                    if groups[i].columns.len() + groups[j].columns.len() > max_width {
                        continue;
                    }
                    let columns = groups[i].columns.combine(&groups[j].columns)?;
                    let estimated_distinct = self.distinct(&columns);
                    let merged = PlannedGroup {
                        columns,
                        estimated_distinct,
                    };
                    let saving = self.cost(objective, &groups[i])
                        + self.cost(objective, &groups[j])
                        - self.cost(objective, &merged);
                    let better = match &best {
                        Some((_, _, top, _)) => saving > *top,
                        None => saving > 0.0,
                    };
                    if better {
                        best = Some((i, j, saving, merged));
                    }
                }
            }

            let Some((i, j, saving, merged)) = best else {
                break;
            };
            debug!(
                "Co-coding columns {} + {} -> {} (saving {:.1})",
                groups[i].columns, groups[j].columns, merged.columns, saving
            );
            groups.remove(j);
            groups[i] = merged;
        }

        let plan = CoCodingPlan {
            rows: self.rows,
            groups,
            sampled_rows: self.sample.len(),
        };
        debug!(
            "Planned {} groups over {} columns from {} sampled rows, estimated {} bytes",
            plan.groups.len(),
            cols,
            plan.sampled_rows,
            plan.estimated_size()
        );
        Ok(plan)
    }
}
