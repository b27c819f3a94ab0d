//! Streaming cluster accumulation.
//!
//! # Algorithm
//!
//! Variants arrive sorted by chromosome then position. The accumulator keeps
//! one in-flight cluster and decides it is complete only when the first
//! variant past its boundary arrives:
//!
//! 1. Empty: start a cluster with the variant.
//! 2. Chromosome change: flush with no right flank, start a new cluster and
//!    forget the left flank (flanks never cross chromosomes).
//! 3. Gap <= max distance: extend the cluster.
//! 4. Gap > max distance: flush with the new variant's position as right
//!    flank, remember the flushed cluster's last position as the next left
//!    flank, start a new cluster.
//! 5. End of stream: flush what is left with no right flank.
//!
//! # Memory Complexity
//!
//! O(c) where c is the number of variants in the current cluster.

use crate::variant::Variant;
use std::mem;

/// A completed cluster together with its flanking positions.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedCluster {
    pub variants: Vec<Variant>,
    /// Last position of the previous cluster on the same chromosome.
    pub prev_flank: Option<u64>,
    /// First position of the next cluster on the same chromosome.
    pub next_flank: Option<u64>,
}

impl FlushedCluster {
    pub fn chrom(&self) -> &str {
        self.variants.first().map(|v| v.chrom.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Empty,
    Accumulating {
        variants: Vec<Variant>,
        last_pos: u64,
    },
}

/// Transition chosen for an incoming variant.
enum Step {
    Start,
    Extend,
    ChromosomeChange,
    Gap { boundary: u64 },
}

/// Single-pass cluster builder over a sorted variant stream.
#[derive(Debug)]
pub struct ClusterAccumulator {
    max_distance: u64,
    state: State,
    prev_flank: Option<u64>,
}

impl ClusterAccumulator {
    pub fn new(max_distance: u64) -> Self {
        Self {
            max_distance,
            state: State::Empty,
            prev_flank: None,
        }
    }

    /// Feed the next variant, returning the cluster it closes, if any.
    pub fn push(&mut self, variant: Variant) -> Option<FlushedCluster> {
        match self.step(&variant) {
            Step::Start => {
                self.start(variant);
                None
            }
            Step::Extend => {
                if let State::Accumulating { variants, last_pos } = &mut self.state {
                    *last_pos = variant.pos;
                    variants.push(variant);
                }
                None
            }
            Step::ChromosomeChange => {
                let flushed = self.flush(None);
                self.prev_flank = None;
                self.start(variant);
                flushed
            }
            Step::Gap { boundary } => {
                let flushed = self.flush(Some(variant.pos));
                self.prev_flank = Some(boundary);
                self.start(variant);
                flushed
            }
        }
    }

    fn step(&self, variant: &Variant) -> Step {
        match &self.state {
            State::Empty => Step::Start,
            State::Accumulating { variants, .. } if variants[0].chrom != variant.chrom => {
                Step::ChromosomeChange
            }
            // positions going backwards count as zero gap
            State::Accumulating { last_pos, .. }
                if variant.pos.saturating_sub(*last_pos) <= self.max_distance =>
            {
                Step::Extend
            }
            State::Accumulating { last_pos, .. } => Step::Gap {
                boundary: *last_pos,
            },
        }
    }

    /// Flush the remaining cluster at end of stream.
    pub fn finish(&mut self) -> Option<FlushedCluster> {
        let flushed = self.flush(None);
        self.prev_flank = None;
        flushed
    }

    /// Number of variants in the in-flight cluster.
    pub fn buffered(&self) -> usize {
        match &self.state {
            State::Empty => 0,
            State::Accumulating { variants, .. } => variants.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, State::Empty)
    }

    fn start(&mut self, variant: Variant) {
        self.state = State::Accumulating {
            last_pos: variant.pos,
            variants: vec![variant],
        };
    }

    fn flush(&mut self, next_flank: Option<u64>) -> Option<FlushedCluster> {
        match mem::take(&mut self.state) {
            State::Empty => None,
            State::Accumulating { variants, .. } if variants.is_empty() => None,
            State::Accumulating { variants, .. } => Some(FlushedCluster {
                variants,
                prev_flank: self.prev_flank,
                next_flank,
            }),
        }
    }
}

/// Split a whole variant sequence into flushed clusters.
///
/// Convenience wrapper over [`ClusterAccumulator`] for in-memory input.
pub fn clusters<I>(variants: I, max_distance: u64) -> Vec<FlushedCluster>
where
    I: IntoIterator<Item = Variant>,
{
    let mut acc = ClusterAccumulator::new(max_distance);
    let mut out: Vec<FlushedCluster> = variants.into_iter().filter_map(|v| acc.push(v)).collect();
    out.extend(acc.finish());
    out
}
