//! Population-frequency annotation and the ultra-rare test.
//!
//! Consequence annotations (VEP `CSQ` style) carry one comma-separated
//! sub-entry per transcript consequence; each sub-entry is a pipe-delimited
//! list of fields whose names are declared once in the VCF header:
//!
//! ```text
//! ##INFO=<ID=CSQ,Number=.,Type=String,Description="... Format: Allele|Consequence|AF">
//! ```
//!
//! The frequency field is located once from that header ([`CsqLayout`]) and
//! every record's annotation is parsed a single time into an [`Annotation`],
//! which the ultra-rare test then walks without touching the raw string again.

use crate::error::{Result, ScanError};

/// Default INFO key holding consequence annotations.
pub const DEFAULT_ANNOTATION_KEY: &str = "CSQ";

/// Default population-frequency field inside each consequence sub-entry.
pub const DEFAULT_FREQUENCY_FIELD: &str = "GnomAD_v4_1_AF_popmax";

/// Column layout of the consequence annotation, resolved from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsqLayout {
    /// INFO key holding the annotation (e.g. `CSQ`).
    pub key: String,
    /// Name of the frequency field.
    pub field: String,
    /// Index of the frequency field within a sub-entry.
    pub index: usize,
}

impl CsqLayout {
    /// Create a layout with an already known field index.
    pub fn new(key: impl Into<String>, field: impl Into<String>, index: usize) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
            index,
        }
    }

    /// Resolve the frequency field index from an INFO header description.
    ///
    /// The field list follows the `Format: ` marker and is pipe-delimited.
    /// A missing marker or an unknown field name is fatal.
    pub fn from_description(description: &str, key: &str, field: &str) -> Result<Self> {
        let missing = || ScanError::MissingAnnotationField {
            key: key.to_string(),
            field: field.to_string(),
        };

        let (_, format) = description.split_once("Format: ").ok_or_else(missing)?;
        let index = format
            .trim()
            .trim_matches('"')
            .split('|')
            .position(|name| name.trim() == field)
            .ok_or_else(missing)?;

        Ok(Self::new(key, field, index))
    }
}

/// Frequency value of one consequence sub-entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frequency {
    /// Field empty or `.`: no estimate available.
    Missing,
    /// Parsed allele frequency.
    Value(f64),
    /// Field present but not a number.
    Malformed,
}

impl Frequency {
    fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw == "." {
            return Frequency::Missing;
        }
        match raw.trim().parse::<f64>() {
            Ok(af) => Frequency::Value(af),
            Err(_) => Frequency::Malformed,
        }
    }
}

/// Per-consequence frequency estimates of one variant.
///
/// Sub-entries too short to contain the frequency field are dropped during
/// parsing; an absent or empty annotation yields no estimates at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    pub frequencies: Vec<Frequency>,
}

impl Annotation {
    /// An annotation without any consequence sub-entries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_frequencies(frequencies: Vec<Frequency>) -> Self {
        Self { frequencies }
    }

    /// Parse a raw annotation value using the resolved field index.
    pub fn parse(raw: &str, index: usize) -> Self {
        if raw.is_empty() {
            return Self::empty();
        }
        let frequencies = raw
            .split(',')
            .filter_map(|entry| entry.split('|').nth(index))
            .map(Frequency::parse)
            .collect();
        Self { frequencies }
    }

    /// Whether the variant is ultra-rare at `af_threshold`.
    ///
    /// Any consequence without an estimate, or with an estimate at or below
    /// the threshold, makes the variant ultra-rare. Malformed estimates are
    /// skipped. A variant with no consequence sub-entries is not ultra-rare.
    pub fn is_ultra_rare(&self, af_threshold: f64) -> bool {
        self.frequencies.iter().any(|freq| match *freq {
            Frequency::Missing => true,
            Frequency::Value(af) => af <= af_threshold,
            Frequency::Malformed => false,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str =
        "Consequence annotations from Ensembl VEP. Format: Allele|Consequence|SYMBOL|GnomAD_v4_1_AF_popmax";

    #[test]
    fn test_layout_resolves_index() {
        let layout =
            CsqLayout::from_description(DESCRIPTION, "CSQ", "GnomAD_v4_1_AF_popmax").unwrap();
        assert_eq!(layout.index, 3);
        assert_eq!(layout.key, "CSQ");
    }

    #[test]
    fn test_layout_strips_quotes() {
        let desc = "\"Consequence annotations. Format: Allele|AF\"";
        let layout = CsqLayout::from_description(desc, "CSQ", "AF").unwrap();
        assert_eq!(layout.index, 1);
    }

    #[test]
    fn test_layout_missing_field_is_fatal() {
        let err = CsqLayout::from_description(DESCRIPTION, "CSQ", "gnomAD_AF").unwrap_err();
        assert!(matches!(err, ScanError::MissingAnnotationField { .. }));

        let err = CsqLayout::from_description("no format here", "CSQ", "AF").unwrap_err();
        assert!(matches!(err, ScanError::MissingAnnotationField { .. }));
    }

    #[test]
    fn test_parse_entries() {
        let ann = Annotation::parse("A|missense|G1|0.5,A|synonymous|G1|.,A|x|G2|abc,A|short", 3);
        assert_eq!(
            ann.frequencies,
            vec![Frequency::Value(0.5), Frequency::Missing, Frequency::Malformed]
        );
    }

    #[test]
    fn test_rare_when_any_consequence_rare() {
        let ann = Annotation::parse("A|x|G|0.2,A|y|G|0.00005", 3);
        assert!(ann.is_ultra_rare(0.0001));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let ann = Annotation::parse("A|x|G|0.0001", 3);
        assert!(ann.is_ultra_rare(0.0001));
        assert!(!ann.is_ultra_rare(0.00009));
    }

    #[test]
    fn test_missing_value_counts_as_rare() {
        assert!(Annotation::parse("A|x|G|", 3).is_ultra_rare(0.0001));
        assert!(Annotation::parse("A|x|G|.", 3).is_ultra_rare(0.0001));
    }

    #[test]
    fn test_common_and_malformed_is_not_rare() {
        let ann = Annotation::parse("A|x|G|0.3,A|y|G|n/a", 3);
        assert!(!ann.is_ultra_rare(0.0001));
    }

    #[test]
    fn test_absent_annotation_is_not_rare() {
        assert!(!Annotation::parse("", 3).is_ultra_rare(0.0001));
        assert!(!Annotation::empty().is_ultra_rare(1.0));
        // every sub-entry too short
        assert!(!Annotation::parse("A|x,A|y", 3).is_ultra_rare(0.0001));
    }
}
