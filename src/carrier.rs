//! Carrier detection and majority-vote carrier sets.

use crate::variant::{GenotypeClass, Variant};

/// Default fraction of a cluster's variants an individual must carry.
pub const DEFAULT_CARRIER_FRACTION: f64 = 0.8;

/// Indices of the individuals carrying a non-reference allele at `variant`.
///
/// Only the first two allele calls are inspected; missing calls never make
/// an individual a carrier. Indices are yielded in ascending order.
pub fn carriers(variant: &Variant) -> impl Iterator<Item = usize> + '_ {
    variant
        .genotypes
        .iter()
        .enumerate()
        .filter(|(_, gt)| gt.has_alt())
        .map(|(i, _)| i)
}

/// True if `individual` is homozygous for the alternate allele at `variant`.
///
/// An individual without a genotype column is not homozygous.
#[inline]
pub fn is_homozygous(variant: &Variant, individual: usize) -> bool {
    variant
        .genotypes
        .get(individual)
        .is_some_and(|gt| gt.class() == GenotypeClass::HomAlt)
}

/// Minimum carrier count for a cluster of `variant_count` variants.
///
/// Computed as `floor(fraction * variant_count)`.
#[inline]
pub fn carrier_threshold(variant_count: usize, fraction: f64) -> usize {
    (fraction * variant_count as f64).floor() as usize
}

/// Individuals shared across a cluster, sorted by index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CarrierSet {
    members: Vec<usize>,
}

impl CarrierSet {
    /// Build the set from explicit member indices.
    pub fn from_members(mut members: Vec<usize>) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    /// Majority-vote carrier set of a cluster.
    ///
    /// An individual is a member when it carries at least one of the variants
    /// and its carrier count reaches [`carrier_threshold`]. The result does
    /// not depend on the order of `variants`.
    pub fn from_cluster(variants: &[Variant], fraction: f64) -> Self {
        let width = variants.iter().map(Variant::sample_count).max().unwrap_or(0);
        let mut counts = vec![0usize; width];
        for variant in variants {
            for i in carriers(variant) {
                counts[i] += 1;
            }
        }

        let threshold = carrier_threshold(variants.len(), fraction);
        let members = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0 && c >= threshold)
            .map(|(i, _)| i)
            .collect();

        Self { members }
    }

    /// True if every member is homozygous-alternate at `variant`.
    ///
    /// Vacuously true for an empty set.
    pub fn all_homozygous(&self, variant: &Variant) -> bool {
        self.members.iter().all(|&i| is_homozygous(variant, i))
    }

    #[inline]
    pub fn contains(&self, individual: usize) -> bool {
        self.members.binary_search(&individual).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.members
    }
}
