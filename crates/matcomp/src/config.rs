//! Compression settings.

use matcomp_core::{CompressionMode, Error, Result};
use serde::{Deserialize, Serialize};

/// Process-level compression settings.
///
/// `mode` is the global default; a workload tree may carry a mode configured
/// at its compression site, which takes precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Default compression mode.
    pub mode: CompressionMode,
    /// Fraction of rows sampled when planning column groups (0.0-1.0].
    pub sample_ratio: f64,
    /// Minimum number of sampled rows; smaller inputs are planned on all rows.
    pub min_sample_size: usize,
    /// Maximum number of columns co-coded into one group.
    pub max_group_width: usize,
    /// Compression is kept only if `original / compressed` exceeds this ratio.
    pub min_compression_ratio: f64,
    /// Threads used when the instruction passes 0 (0 = all cores).
    pub default_threads: usize,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            mode: CompressionMode::Auto,
            sample_ratio: 0.05,
            min_sample_size: 2000,
            max_group_width: 16,
            min_compression_ratio: 1.0,
            default_threads: 0,
        }
    }
}

impl CompressionSettings {
    /// Parse settings from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Set the default mode.
    pub fn with_mode(mut self, mode: CompressionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the planning sample ratio.
    pub fn with_sample_ratio(mut self, ratio: f64) -> Self {
        self.sample_ratio = ratio;
        self
    }

    /// Set the minimum sample size.
    pub fn with_min_sample_size(mut self, rows: usize) -> Self {
        self.min_sample_size = rows;
        self
    }

    /// Set the maximum group width.
    pub fn with_max_group_width(mut self, width: usize) -> Self {
        self.max_group_width = width;
        self
    }

    /// Set the minimum compression ratio.
    pub fn with_min_compression_ratio(mut self, ratio: f64) -> Self {
        self.min_compression_ratio = ratio;
        self
    }

    /// Set the default thread count.
    pub fn with_default_threads(mut self, threads: usize) -> Self {
        self.default_threads = threads;
        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_ratio > 0.0 && self.sample_ratio <= 1.0) {
            return Err(Error::InvalidSettings(format!(
                "sample_ratio must be in (0, 1], got {}",
                self.sample_ratio
            )));
        }
        if self.max_group_width == 0 {
            return Err(Error::InvalidSettings(
                "max_group_width must be at least 1".into(),
            ));
        }
        if !self.min_compression_ratio.is_finite() || self.min_compression_ratio < 0.0 {
            return Err(Error::InvalidSettings(format!(
                "min_compression_ratio must be finite and non-negative, got {}",
                self.min_compression_ratio
            )));
        }
        Ok(())
    }

    /// Thread count to use for a requested count (0 = default).
    pub fn resolve_threads(&self, requested: usize) -> usize {
        let threads = if requested > 0 {
            requested
        } else {
            self.default_threads
        };
        if threads > 0 {
            threads
        } else {
            num_cpus::get().max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = CompressionSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.mode, CompressionMode::Auto);
    }

    #[test]
    fn test_from_json_partial() {
        let settings =
            CompressionSettings::from_json(r#"{ "mode": "Cost", "max_group_width": 4 }"#).unwrap();
        assert_eq!(settings.mode, CompressionMode::Cost);
        assert_eq!(settings.max_group_width, 4);
        assert_eq!(settings.min_sample_size, 2000);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(CompressionSettings::from_json(r#"{ "sample_ratio": 0.0 }"#).is_err());
        assert!(CompressionSettings::from_json(r#"{ "max_group_width": 0 }"#).is_err());
        assert!(CompressionSettings::from_json("not json").is_err());
    }

    #[test]
    fn test_resolve_threads() {
        let settings = CompressionSettings::default().with_default_threads(3);
        assert_eq!(settings.resolve_threads(8), 8);
        assert_eq!(settings.resolve_threads(0), 3);
        assert!(CompressionSettings::default().resolve_threads(0) >= 1);
    }
}
