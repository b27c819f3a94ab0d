//! Parallel processing utilities using Rayon.
//!
//! A chromosome change always closes a cluster and nulls its flanks, so
//! per-chromosome runs can be scanned independently and concatenated.

use crate::variant::Variant;
use rayon::prelude::*;

/// Minimum number of chromosome runs before enabling parallelization.
pub const PARALLEL_THRESHOLD: usize = 2;

/// Split a sorted variant sequence into contiguous per-chromosome runs,
/// preserving input order.
pub fn split_by_chromosome(variants: Vec<Variant>) -> Vec<Vec<Variant>> {
    let mut runs: Vec<Vec<Variant>> = Vec::new();

    for variant in variants {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|last| last.chrom == variant.chrom) => {
                run.push(variant)
            }
            _ => runs.push(vec![variant]),
        }
    }

    runs
}

/// Process runs in parallel, returning results in run order.
pub fn process_runs<F, T>(runs: Vec<Vec<Variant>>, f: F) -> Vec<T>
where
    F: Fn(Vec<Variant>) -> T + Sync + Send,
    T: Send,
{
    if runs.len() < PARALLEL_THRESHOLD {
        return runs.into_iter().map(f).collect();
    }
    runs.into_par_iter().map(f).collect()
}
