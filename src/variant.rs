//! Per-record variant shape consumed by the scan.

use crate::annotation::Annotation;
use std::fmt;

/// Genotype category of one individual at one variant.
///
/// Discriminants follow the conventional `gt_types` encoding
/// (0 = hom-ref, 1 = het, 2 = unknown, 3 = hom-alt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GenotypeClass {
    HomRef = 0,
    Het = 1,
    Unknown = 2,
    HomAlt = 3,
}

/// Called alleles for one individual.
///
/// Only the first two allele calls are kept; `None` marks a missing call.
/// A haploid call stores its single allele in `first` and leaves `second`
/// empty with `haploid` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Genotype {
    pub first: Option<u32>,
    pub second: Option<u32>,
    pub haploid: bool,
}

impl Genotype {
    /// A missing diploid call (`./.`).
    pub const MISSING: Genotype = Genotype {
        first: None,
        second: None,
        haploid: false,
    };

    /// Create a diploid genotype.
    #[inline]
    pub fn diploid(first: Option<u32>, second: Option<u32>) -> Self {
        Self {
            first,
            second,
            haploid: false,
        }
    }

    /// Create a haploid genotype.
    #[inline]
    pub fn haploid(allele: Option<u32>) -> Self {
        Self {
            first: allele,
            second: None,
            haploid: true,
        }
    }

    /// Parse a GT value such as `0/1`, `1|1`, `./.` or `1`.
    ///
    /// Allele tokens that are not integers are treated as missing calls.
    /// Alleles beyond the second are ignored.
    pub fn parse(gt: &[u8]) -> Self {
        let mut alleles = gt.split(|&b| b == b'/' || b == b'|');
        let first = alleles.next().and_then(parse_allele);
        match alleles.next() {
            Some(token) => Self::diploid(first, parse_allele(token)),
            None => Self::haploid(first),
        }
    }

    /// True if either of the first two alleles is non-reference.
    #[inline]
    pub fn has_alt(&self) -> bool {
        matches!(self.first, Some(a) if a > 0) || matches!(self.second, Some(a) if a > 0)
    }

    /// Categorize the call.
    ///
    /// Any missing allele makes the call unknown. A diploid call is hom-alt
    /// only when both alleles are the same non-reference allele; a haploid
    /// non-reference call also counts as hom-alt.
    pub fn class(&self) -> GenotypeClass {
        if self.haploid {
            return match self.first {
                None => GenotypeClass::Unknown,
                Some(0) => GenotypeClass::HomRef,
                Some(_) => GenotypeClass::HomAlt,
            };
        }
        match (self.first, self.second) {
            (Some(a), Some(b)) if a == b && a == 0 => GenotypeClass::HomRef,
            (Some(a), Some(b)) if a == b => GenotypeClass::HomAlt,
            (Some(_), Some(_)) => GenotypeClass::Het,
            _ => GenotypeClass::Unknown,
        }
    }
}

#[inline]
fn parse_allele(token: &[u8]) -> Option<u32> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allele = |a: Option<u32>| a.map(|v| v.to_string()).unwrap_or_else(|| ".".to_string());
        if self.haploid {
            write!(f, "{}", allele(self.first))
        } else {
            write!(f, "{}/{}", allele(self.first), allele(self.second))
        }
    }
}

/// One variant record: position, per-individual calls and the parsed
/// population-frequency annotation.
///
/// `genotypes[i]` belongs to the individual with sample index `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub chrom: String,
    /// 1-based position as written in the VCF.
    pub pos: u64,
    pub genotypes: Vec<Genotype>,
    pub annotation: Annotation,
}

impl Variant {
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        genotypes: Vec<Genotype>,
        annotation: Annotation,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            genotypes,
            annotation,
        }
    }

    /// Number of individuals with a genotype column.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.genotypes.len()
    }
}
