//! Scan configuration.
//!
//! Every threshold of the clustering and filter chain lives here, including
//! the policy constants (carrier fraction, region padding, output label) so
//! sensitivity can be tuned without code changes.

use crate::annotation::{DEFAULT_ANNOTATION_KEY, DEFAULT_FREQUENCY_FIELD};
use crate::carrier::DEFAULT_CARRIER_FRACTION;
use crate::error::{Result, ScanError};
use crate::regions::DEFAULT_REGION_PADDING;

/// Default maximum gap (bp) between consecutive variants of one cluster.
pub const DEFAULT_CLUSTER_DISTANCE: u64 = 2000;

/// Default minimum number of shared carriers.
pub const DEFAULT_MIN_INDIVIDUALS: usize = 2;

/// Default minimum number of variants per segment.
pub const DEFAULT_MIN_VARIANTS: usize = 8;

/// Default minimum number of ultra-rare variants per segment.
pub const DEFAULT_MIN_ULTRA_RARE: usize = 1;

/// Default allele-frequency ceiling for an ultra-rare variant.
pub const DEFAULT_AF_THRESHOLD: f64 = 0.0001;

/// Label written in the last output column.
pub const DEFAULT_LABEL: &str = "ULTRA_RARE";

/// Thresholds and policy for one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Maximum position gap between consecutive variants of a cluster.
    pub max_cluster_distance: u64,
    pub min_individuals: usize,
    pub max_individuals: Option<usize>,
    pub min_variants: usize,
    pub min_segment_length: u64,
    pub max_segment_length: Option<u64>,
    pub min_ultra_rare: usize,
    pub af_threshold: f64,
    /// Fraction of a cluster's variants an individual must carry.
    pub carrier_fraction: f64,
    /// Padding applied to both sides of each gene region.
    pub region_padding: u64,
    pub label: String,
    /// INFO key holding consequence annotations.
    pub annotation_key: String,
    /// Frequency field name inside each consequence sub-entry.
    pub frequency_field: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self {
            max_cluster_distance: DEFAULT_CLUSTER_DISTANCE,
            min_individuals: DEFAULT_MIN_INDIVIDUALS,
            max_individuals: None,
            min_variants: DEFAULT_MIN_VARIANTS,
            min_segment_length: 0,
            max_segment_length: None,
            min_ultra_rare: DEFAULT_MIN_ULTRA_RARE,
            af_threshold: DEFAULT_AF_THRESHOLD,
            carrier_fraction: DEFAULT_CARRIER_FRACTION,
            region_padding: DEFAULT_REGION_PADDING,
            label: DEFAULT_LABEL.to_string(),
            annotation_key: DEFAULT_ANNOTATION_KEY.to_string(),
            frequency_field: DEFAULT_FREQUENCY_FIELD.to_string(),
        }
    }

    pub fn with_cluster_distance(mut self, d: u64) -> Self {
        self.max_cluster_distance = d;
        self
    }

    pub fn with_individuals(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_individuals = min;
        self.max_individuals = max;
        self
    }

    pub fn with_min_variants(mut self, n: usize) -> Self {
        self.min_variants = n;
        self
    }

    pub fn with_segment_length(mut self, min: u64, max: Option<u64>) -> Self {
        self.min_segment_length = min;
        self.max_segment_length = max;
        self
    }

    pub fn with_min_ultra_rare(mut self, n: usize) -> Self {
        self.min_ultra_rare = n;
        self
    }

    pub fn with_af_threshold(mut self, af: f64) -> Self {
        self.af_threshold = af;
        self
    }

    pub fn with_carrier_fraction(mut self, fraction: f64) -> Self {
        self.carrier_fraction = fraction;
        self
    }

    pub fn with_region_padding(mut self, padding: u64) -> Self {
        self.region_padding = padding;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, field: impl Into<String>) -> Self {
        self.annotation_key = key.into();
        self.frequency_field = field.into();
        self
    }

    /// Check that the thresholds are mutually consistent.
    pub fn validate(&self) -> Result<()> {
        if !(self.carrier_fraction > 0.0 && self.carrier_fraction <= 1.0) {
            return Err(ScanError::InvalidConfig(format!(
                "carrier fraction must be in (0, 1], got {}",
                self.carrier_fraction
            )));
        }
        if self.af_threshold.is_nan() || self.af_threshold < 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "allele-frequency threshold must be non-negative, got {}",
                self.af_threshold
            )));
        }
        if let Some(max) = self.max_individuals {
            if max < self.min_individuals {
                return Err(ScanError::InvalidConfig(format!(
                    "max individuals ({}) is below min individuals ({})",
                    max, self.min_individuals
                )));
            }
        }
        if let Some(max) = self.max_segment_length {
            if max < self.min_segment_length {
                return Err(ScanError::InvalidConfig(format!(
                    "max segment length ({}) is below min segment length ({})",
                    max, self.min_segment_length
                )));
            }
        }
        if self.label.contains(['\t', '\n']) {
            return Err(ScanError::InvalidConfig(
                "label must not contain tabs or newlines".to_string(),
            ));
        }
        Ok(())
    }

    /// True if a segment of `length` bp passes the length bounds.
    #[inline]
    pub fn accepts_length(&self, length: u64) -> bool {
        length >= self.min_segment_length && self.max_segment_length.is_none_or(|max| length <= max)
    }

    /// True if `n` shared carriers passes the individual-count bounds.
    #[inline]
    pub fn accepts_carrier_count(&self, n: usize) -> bool {
        n >= self.min_individuals && self.max_individuals.is_none_or(|max| n <= max)
    }
}
