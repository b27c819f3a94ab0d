//! Streaming scan for rare shared haplotype segments.
//!
//! Reads a sorted VCF one record at a time, groups nearby variants into
//! clusters, and evaluates each cluster as soon as the next record (or end
//! of input) closes it.
//!
//! # Algorithm
//!
//! 1. Read variants in order, validating sort order inline
//! 2. Feed each variant to the cluster accumulator
//! 3. When a cluster closes, compute its shared carriers, split it into
//!    single/double blocks and run each block through the filter chain
//! 4. Write surviving blocks immediately
//!
//! # Memory Complexity
//!
//! O(largest cluster) in serial mode. Parallel mode loads the whole stream.
//!
//! # Requirements
//!
//! Input MUST be sorted by chromosome, then by position.

use crate::cluster::{clusters, ClusterAccumulator};
use crate::config::ScanConfig;
use crate::error::Result;
use crate::parallel::{process_runs, split_by_chromosome};
use crate::regions::GeneRegionSet;
use crate::segment::{FilterStats, OutputRecord, SegmentEmitter};
use crate::streaming::{RecordWriter, SortValidator};
use crate::variant::Variant;
use crate::vcf::VcfReader;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Variants between progress updates.
const PROGRESS_INTERVAL: usize = 10_000;

/// Scan command configuration.
#[derive(Debug, Clone, Default)]
pub struct ScanCommand {
    pub config: ScanConfig,
    /// Skip the inline sort check
    pub assume_sorted: bool,
    /// Write a column header line before the records
    pub header: bool,
    /// Show a spinner on stderr while scanning
    pub progress: bool,
}

impl ScanCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_assume_sorted(mut self, assume_sorted: bool) -> Self {
        self.assume_sorted = assume_sorted;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Open a VCF file and scan it.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        vcf_path: P,
        regions: &GeneRegionSet,
        output: &mut W,
    ) -> Result<ScanStats> {
        let reader = self.open(vcf_path)?;
        self.run_streaming(reader, regions, output)
    }

    /// Open a VCF file and scan its chromosomes in parallel.
    pub fn run_parallel<P: AsRef<Path>, W: Write>(
        &self,
        vcf_path: P,
        regions: &GeneRegionSet,
        output: &mut W,
    ) -> Result<ScanStats> {
        let reader = self.open(vcf_path)?;
        self.run_parallel_reader(reader, regions, output)
    }

    fn open<P: AsRef<Path>>(&self, vcf_path: P) -> Result<VcfReader<Box<dyn Read>>> {
        let reader = VcfReader::from_path(
            vcf_path,
            &self.config.annotation_key,
            &self.config.frequency_field,
        )?;
        info!(
            "{} samples, {} field at index {}",
            reader.samples().len(),
            reader.header().layout.field,
            reader.header().layout.index
        );
        Ok(reader)
    }

    /// Core streaming scan.
    ///
    /// Holds only the cluster being accumulated in memory.
    pub fn run_streaming<R: Read, W: Write>(
        &self,
        mut reader: VcfReader<R>,
        regions: &GeneRegionSet,
        output: &mut W,
    ) -> Result<ScanStats> {
        let samples = reader.samples().to_vec();
        let mut stats = ScanStats::default();
        let mut writer = RecordWriter::new(output);
        if self.header {
            writer.write_header()?;
        }

        let mut validator = SortValidator::new();
        let mut accumulator = ClusterAccumulator::new(self.config.max_cluster_distance);
        let mut emitter = SegmentEmitter::new(&self.config, regions, &samples);
        let progress = self.progress_bar();

        while let Some(variant) = reader.read_variant()? {
            if !self.assume_sorted {
                validator.validate_variant(&variant)?;
            }
            stats.variants_read += 1;
            if stats.variants_read % PROGRESS_INTERVAL == 0 {
                progress.set_position(stats.variants_read as u64);
            }

            if let Some(cluster) = accumulator.push(variant) {
                for record in emitter.emit(&cluster) {
                    writer.write_record(&record)?;
                }
            }
        }
        if let Some(cluster) = accumulator.finish() {
            for record in emitter.emit(&cluster) {
                writer.write_record(&record)?;
            }
        }

        writer.flush()?;
        progress.finish_and_clear();

        stats.records_written = writer.records_written();
        stats.malformed_genotypes = reader.malformed_genotypes();
        stats.filters = emitter.into_stats();
        warn_malformed(&stats);
        Ok(stats)
    }

    /// Load the stream, scan each chromosome on the rayon pool, and write
    /// results in input chromosome order.
    ///
    /// Output is identical to [`ScanCommand::run_streaming`].
    pub fn run_parallel_reader<R: Read, W: Write>(
        &self,
        mut reader: VcfReader<R>,
        regions: &GeneRegionSet,
        output: &mut W,
    ) -> Result<ScanStats> {
        let samples = reader.samples().to_vec();
        let mut stats = ScanStats::default();
        let mut validator = SortValidator::new();
        let progress = self.progress_bar();

        let mut variants = Vec::new();
        while let Some(variant) = reader.read_variant()? {
            if !self.assume_sorted {
                validator.validate_variant(&variant)?;
            }
            variants.push(variant);
            if variants.len() % PROGRESS_INTERVAL == 0 {
                progress.set_position(variants.len() as u64);
            }
        }
        stats.variants_read = variants.len();
        stats.malformed_genotypes = reader.malformed_genotypes();

        let runs = split_by_chromosome(variants);
        progress.set_message(format!("scanning {} chromosomes", runs.len()));
        let results = process_runs(runs, |run| {
            scan_variants(run, &self.config, regions, &samples)
        });
        progress.finish_and_clear();

        let mut writer = RecordWriter::new(output);
        if self.header {
            writer.write_header()?;
        }
        for (records, filters) in &results {
            for record in records {
                writer.write_record(record)?;
            }
            stats.filters.merge(filters);
        }
        writer.flush()?;

        stats.records_written = writer.records_written();
        warn_malformed(&stats);
        Ok(stats)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let style =
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} variants {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

/// Scan an in-memory variant sequence, returning its records and filter
/// counters.
pub fn scan_variants<I>(
    variants: I,
    config: &ScanConfig,
    regions: &GeneRegionSet,
    samples: &[String],
) -> (Vec<OutputRecord>, FilterStats)
where
    I: IntoIterator<Item = Variant>,
{
    let mut emitter = SegmentEmitter::new(config, regions, samples);
    let mut records = Vec::new();
    for cluster in clusters(variants, config.max_cluster_distance) {
        records.extend(emitter.emit(&cluster));
    }
    (records, emitter.into_stats())
}

fn warn_malformed(stats: &ScanStats) {
    if stats.malformed_genotypes > 0 {
        warn!(
            "{} genotype columns could not be parsed and were treated as missing",
            stats.malformed_genotypes
        );
    }
}

/// Statistics from a scan.
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    /// Number of variant records read
    pub variants_read: usize,
    /// Genotype columns treated as missing because they failed to parse
    pub malformed_genotypes: usize,
    /// Number of segment records written
    pub records_written: usize,
    pub filters: FilterStats,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Variants: {}, Records: {}, Malformed genotypes: {}, {}",
            self.variants_read, self.records_written, self.malformed_genotypes, self.filters
        )
    }
}
