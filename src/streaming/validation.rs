//! Sort validation for the variant stream.
//!
//! Cluster boundaries depend on variant order, so the scan requires input
//! sorted by chromosome then position. Validation checks that:
//! 1. All records for a chromosome are contiguous (no interleaving)
//! 2. Within a chromosome, positions are non-decreasing
//!
//! Any consistent chromosome order is accepted (lexicographic or karyotypic).

use crate::error::{Result, ScanError};
use crate::variant::Variant;
use rustc_hash::FxHashSet;

/// Inline sort validator for use within streaming loops.
///
/// Validates as records are processed so the input is read only once.
#[derive(Debug, Default)]
pub struct SortValidator {
    prev_chrom: Option<String>,
    prev_pos: u64,
    seen_chroms: FxHashSet<String>,
    record_count: usize,
}

impl SortValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that the given record maintains sort order.
    #[inline]
    pub fn validate(&mut self, chrom: &str, pos: u64) -> Result<()> {
        self.record_count += 1;

        match self.prev_chrom.as_deref() {
            Some(prev) if prev == chrom => {
                if pos < self.prev_pos {
                    return Err(ScanError::InvalidFormat(format!(
                        "VCF not sorted: position {} at record {} comes after {} on {}",
                        pos, self.record_count, self.prev_pos, chrom
                    )));
                }
            }
            Some(_) => {
                if self.seen_chroms.contains(chrom) {
                    return Err(ScanError::InvalidFormat(format!(
                        "VCF not sorted: chromosome '{}' at record {} was seen earlier (chromosomes must be contiguous)",
                        chrom, self.record_count
                    )));
                }
                if let Some(prev) = self.prev_chrom.take() {
                    self.seen_chroms.insert(prev);
                }
                self.prev_chrom = Some(chrom.to_string());
            }
            None => self.prev_chrom = Some(chrom.to_string()),
        }

        self.prev_pos = pos;
        Ok(())
    }

    /// Validate a variant.
    #[inline]
    pub fn validate_variant(&mut self, variant: &Variant) -> Result<()> {
        self.validate(&variant.chrom, variant.pos)
    }

    /// Get the number of records validated.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Chromosomes seen so far, including the current one.
    pub fn chromosome_count(&self) -> usize {
        self.seen_chroms.len() + usize::from(self.prev_chrom.is_some())
    }
}

/// Verify that a sequence of variants is sorted, returning the record count.
pub fn verify_sorted<I>(variants: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<Variant>>,
{
    let mut validator = SortValidator::new();
    for variant in variants {
        validator.validate_variant(&variant?)?;
    }
    Ok(validator.record_count())
}
