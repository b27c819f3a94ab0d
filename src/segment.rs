//! Segment emission for flushed clusters.
//!
//! # Algorithm
//!
//! For each flushed cluster:
//! 1. Compute the majority-vote carrier set; discard the cluster if the
//!    carrier count is outside the configured bounds.
//! 2. Partition the cluster into blocks of homogeneous zygosity mode
//!    ("double" when every shared carrier is hom-alt, "single" otherwise).
//! 3. Run each block through the filter chain (variant count, segment
//!    length, gene-region overlap, ultra-rare count) and emit a record for
//!    every block that passes. Blocks are evaluated independently.

use crate::carrier::CarrierSet;
use crate::cluster::FlushedCluster;
use crate::config::ScanConfig;
use crate::regions::GeneRegionSet;
use crate::variant::Variant;
use log::debug;
use std::fmt;

/// Zygosity mode of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// At least one shared carrier is not hom-alt.
    Single,
    /// Every shared carrier is hom-alt.
    Double,
}

impl Mode {
    /// Mode of one variant with respect to the shared carriers.
    #[inline]
    pub fn of(variant: &Variant, carriers: &CarrierSet) -> Self {
        if carriers.all_homozygous(variant) {
            Mode::Double
        } else {
            Mode::Single
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Double => "double",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A maximal run of same-mode variants, as inclusive indices into the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub mode: Mode,
}

impl Block {
    /// Number of variants in the block; never zero.
    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Partition `variants` into maximal same-mode blocks.
///
/// The blocks cover every index exactly once, in order, and adjacent blocks
/// differ in mode. An empty input yields no blocks.
pub fn partition_blocks(variants: &[Variant], carriers: &CarrierSet) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut modes = variants.iter().map(|v| Mode::of(v, carriers)).enumerate();

    let Some((_, mut current)) = modes.next() else {
        return blocks;
    };
    let mut start = 0;
    for (idx, mode) in modes {
        if mode != current {
            blocks.push(Block {
                start,
                end: idx - 1,
                mode: current,
            });
            start = idx;
            current = mode;
        }
    }
    blocks.push(Block {
        start,
        end: variants.len() - 1,
        mode: current,
    });
    blocks
}

/// One qualifying shared segment.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub variant_count: usize,
    pub shared_individuals: usize,
    /// Sample ids of the shared carriers, in sample order.
    pub individuals: Vec<String>,
    pub mode: Mode,
    /// Distance from `start` back to the nearest variant outside the block.
    pub left_gap: Option<u64>,
    /// Distance from `end` forward to the nearest variant outside the block.
    pub right_gap: Option<u64>,
    pub ultra_rare_count: usize,
    pub label: String,
}

/// Per-stage counters of the filter chain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub clusters: usize,
    /// Clusters holding a single variant, never evaluated.
    pub singleton_clusters: usize,
    /// Clusters whose carrier count fell outside the bounds.
    pub carrier_rejected: usize,
    pub blocks: usize,
    pub too_few_variants: usize,
    pub length_rejected: usize,
    pub outside_regions: usize,
    pub too_few_ultra_rare: usize,
    pub emitted: usize,
}

impl FilterStats {
    /// Add the counters of another run.
    pub fn merge(&mut self, other: &FilterStats) {
        self.clusters += other.clusters;
        self.singleton_clusters += other.singleton_clusters;
        self.carrier_rejected += other.carrier_rejected;
        self.blocks += other.blocks;
        self.too_few_variants += other.too_few_variants;
        self.length_rejected += other.length_rejected;
        self.outside_regions += other.outside_regions;
        self.too_few_ultra_rare += other.too_few_ultra_rare;
        self.emitted += other.emitted;
    }
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Clusters: {} (singletons: {}, carrier-rejected: {}), Blocks: {} \
             (few variants: {}, length: {}, no gene: {}, few ultra-rare: {}), Emitted: {}",
            self.clusters,
            self.singleton_clusters,
            self.carrier_rejected,
            self.blocks,
            self.too_few_variants,
            self.length_rejected,
            self.outside_regions,
            self.too_few_ultra_rare,
            self.emitted
        )
    }
}

/// Turns flushed clusters into output records.
pub struct SegmentEmitter<'a> {
    config: &'a ScanConfig,
    regions: &'a GeneRegionSet,
    samples: &'a [String],
    stats: FilterStats,
}

impl<'a> SegmentEmitter<'a> {
    /// `samples[i]` is the id written for individual `i`.
    pub fn new(config: &'a ScanConfig, regions: &'a GeneRegionSet, samples: &'a [String]) -> Self {
        Self {
            config,
            regions,
            samples,
            stats: FilterStats::default(),
        }
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    pub fn into_stats(self) -> FilterStats {
        self.stats
    }

    /// Evaluate one flushed cluster, returning zero or more records.
    pub fn emit(&mut self, cluster: &FlushedCluster) -> Vec<OutputRecord> {
        let variants = &cluster.variants;
        if variants.is_empty() {
            return Vec::new();
        }
        self.stats.clusters += 1;

        if variants.len() < 2 {
            debug!(
                "{}:{} discarded: single-variant cluster",
                cluster.chrom(),
                variants[0].pos
            );
            self.stats.singleton_clusters += 1;
            return Vec::new();
        }

        let carriers = CarrierSet::from_cluster(variants, self.config.carrier_fraction);
        if !self.config.accepts_carrier_count(carriers.len()) {
            debug!(
                "{}:{}-{} discarded: {} shared carriers",
                cluster.chrom(),
                variants[0].pos,
                variants[variants.len() - 1].pos,
                carriers.len()
            );
            self.stats.carrier_rejected += 1;
            return Vec::new();
        }

        let individuals: Vec<String> = carriers
            .iter()
            .map(|i| {
                self.samples
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| i.to_string())
            })
            .collect();

        let mut records = Vec::new();
        for block in partition_blocks(variants, &carriers) {
            self.stats.blocks += 1;
            if let Some(record) = self.evaluate_block(cluster, block, &individuals) {
                self.stats.emitted += 1;
                records.push(record);
            }
        }
        records
    }

    fn evaluate_block(
        &mut self,
        cluster: &FlushedCluster,
        block: Block,
        individuals: &[String],
    ) -> Option<OutputRecord> {
        let variants = &cluster.variants;
        let block_variants = &variants[block.start..=block.end];

        if block_variants.len() < self.config.min_variants {
            self.stats.too_few_variants += 1;
            return None;
        }

        let start = block_variants[0].pos;
        let end = block_variants[block_variants.len() - 1].pos;
        if !self.config.accepts_length(end.saturating_sub(start)) {
            self.stats.length_rejected += 1;
            return None;
        }

        if !self.regions.overlaps(cluster.chrom(), start, end) {
            self.stats.outside_regions += 1;
            return None;
        }

        let ultra_rare_count = block_variants
            .iter()
            .filter(|v| v.annotation.is_ultra_rare(self.config.af_threshold))
            .count();
        if ultra_rare_count < self.config.min_ultra_rare {
            self.stats.too_few_ultra_rare += 1;
            return None;
        }

        let left_flank = if block.start > 0 {
            Some(variants[block.start - 1].pos)
        } else {
            cluster.prev_flank
        };
        let right_flank = match variants.get(block.end + 1) {
            Some(next) => Some(next.pos),
            None => cluster.next_flank,
        };

        Some(OutputRecord {
            chrom: cluster.chrom().to_string(),
            start,
            end,
            variant_count: block_variants.len(),
            shared_individuals: individuals.len(),
            individuals: individuals.to_vec(),
            mode: block.mode,
            left_gap: left_flank.map(|flank| start.saturating_sub(flank)),
            right_gap: right_flank.map(|flank| flank.saturating_sub(end)),
            ultra_rare_count,
            label: self.config.label.clone(),
        })
    }
}
