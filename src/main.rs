//! rarehap: rare shared haplotype segment scanner
//!
//! Usage: rarehap <COMMAND> [OPTIONS]

use clap::{Args, Parser, Subcommand};
use log::{error, info, Level};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use rarehap::annotation::{DEFAULT_ANNOTATION_KEY, DEFAULT_FREQUENCY_FIELD};
use rarehap::carrier::DEFAULT_CARRIER_FRACTION;
use rarehap::commands::ScanCommand;
use rarehap::config::{
    ScanConfig, DEFAULT_AF_THRESHOLD, DEFAULT_CLUSTER_DISTANCE, DEFAULT_LABEL,
    DEFAULT_MIN_INDIVIDUALS, DEFAULT_MIN_ULTRA_RARE, DEFAULT_MIN_VARIANTS,
};
use rarehap::error::Result;
use rarehap::regions::{GeneRegionSet, DEFAULT_REGION_PADDING};
use rarehap::streaming::verify_sorted;
use rarehap::vcf::VcfReader;

#[derive(Parser)]
#[command(name = "rarehap")]
#[command(version)]
#[command(about = "Find rare haplotype segments shared by several individuals in a multi-sample VCF", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every discarded cluster
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a sorted VCF for shared ultra-rare segments
    Scan {
        /// Input VCF file (plain or gzip/bgzip)
        vcf: PathBuf,

        /// Gene region file (CSV with chromosome_name,start_position,end_position or BED)
        #[arg(short, long)]
        regions: PathBuf,

        /// Write records to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Write a column header line first
        #[arg(long)]
        header: bool,

        /// Log run statistics
        #[arg(long)]
        stats: bool,

        /// Show a spinner while scanning
        #[arg(long)]
        progress: bool,

        /// Skip sorted validation (faster for pre-sorted input)
        #[arg(long)]
        assume_sorted: bool,

        /// Scan chromosomes in parallel (loads the whole VCF)
        #[arg(long)]
        parallel: bool,
    },

    /// Check that a VCF is sorted and declares the annotation field
    Validate {
        /// Input VCF file (plain or gzip/bgzip)
        vcf: PathBuf,

        /// INFO key holding consequence annotations
        #[arg(long, default_value = DEFAULT_ANNOTATION_KEY)]
        annotation_key: String,

        /// Population frequency field inside each annotation
        #[arg(long, default_value = DEFAULT_FREQUENCY_FIELD)]
        frequency_field: String,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Maximum distance between consecutive variants of a cluster
    #[arg(long, default_value_t = DEFAULT_CLUSTER_DISTANCE)]
    cluster_distance: u64,

    /// Minimum number of shared individuals
    #[arg(long, default_value_t = DEFAULT_MIN_INDIVIDUALS)]
    min_individuals: usize,

    /// Maximum number of shared individuals
    #[arg(long)]
    max_individuals: Option<usize>,

    /// Minimum number of variants in a segment
    #[arg(long, default_value_t = DEFAULT_MIN_VARIANTS)]
    min_variants: usize,

    /// Minimum segment length in bp
    #[arg(long, default_value_t = 0)]
    min_segment_length: u64,

    /// Maximum segment length in bp
    #[arg(long)]
    max_segment_length: Option<u64>,

    /// Minimum number of ultra-rare variants in a segment
    #[arg(long, default_value_t = DEFAULT_MIN_ULTRA_RARE)]
    min_ultra_rare: usize,

    /// Allele frequency at or below which a variant is ultra-rare
    #[arg(long, default_value_t = DEFAULT_AF_THRESHOLD)]
    ultra_rare_threshold: f64,

    /// Fraction of a cluster's variants an individual must carry
    #[arg(long, default_value_t = DEFAULT_CARRIER_FRACTION)]
    carrier_fraction: f64,

    /// Padding added to both sides of each gene region
    #[arg(long, default_value_t = DEFAULT_REGION_PADDING)]
    region_padding: u64,

    /// Label written in the last output column
    #[arg(long, default_value = DEFAULT_LABEL)]
    label: String,

    /// INFO key holding consequence annotations
    #[arg(long, default_value = DEFAULT_ANNOTATION_KEY)]
    annotation_key: String,

    /// Population frequency field inside each annotation
    #[arg(long, default_value = DEFAULT_FREQUENCY_FIELD)]
    frequency_field: String,
}

impl FilterArgs {
    fn into_config(self) -> ScanConfig {
        ScanConfig::new()
            .with_cluster_distance(self.cluster_distance)
            .with_individuals(self.min_individuals, self.max_individuals)
            .with_min_variants(self.min_variants)
            .with_segment_length(self.min_segment_length, self.max_segment_length)
            .with_min_ultra_rare(self.min_ultra_rare)
            .with_af_threshold(self.ultra_rare_threshold)
            .with_carrier_fraction(self.carrier_fraction)
            .with_region_padding(self.region_padding)
            .with_label(self.label)
            .with_annotation(self.annotation_key, self.frequency_field)
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::Warn
    } else if cli.verbose {
        Level::Debug
    } else {
        Level::Info
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Error: failed to initialize logger: {}", e);
    }

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            error!("Failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Scan {
            vcf,
            regions,
            output,
            filters,
            header,
            stats,
            progress,
            assume_sorted,
            parallel,
        } => {
            let cmd = ScanCommand::new()
                .with_config(filters.into_config())
                .with_header(header)
                .with_progress(progress)
                .with_assume_sorted(assume_sorted);
            run_scan(cmd, vcf, regions, output, stats, parallel)
        }

        Commands::Validate {
            vcf,
            annotation_key,
            frequency_field,
        } => run_validate(vcf, &annotation_key, &frequency_field),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        process::exit(1);
    }
}

fn run_scan(
    cmd: ScanCommand,
    vcf: PathBuf,
    regions_path: PathBuf,
    output: Option<PathBuf>,
    stats: bool,
    parallel: bool,
) -> Result<()> {
    cmd.config.validate()?;
    let start = Instant::now();

    let regions = GeneRegionSet::load(&regions_path, cmd.config.region_padding)?;
    info!(
        "Loaded {} gene regions on {} chromosomes from {}",
        regions.len(),
        regions.chromosomes().count(),
        regions_path.display()
    );

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    let result = if parallel {
        cmd.run_parallel(&vcf, &regions, &mut writer)?
    } else {
        cmd.run(&vcf, &regions, &mut writer)?
    };
    writer.flush()?;

    if stats {
        info!("Scan stats: {}", result);
    }
    info!(
        "Wrote {} segments in {:.2?}",
        result.records_written,
        start.elapsed()
    );
    Ok(())
}

fn run_validate(vcf: PathBuf, annotation_key: &str, frequency_field: &str) -> Result<()> {
    let reader = VcfReader::from_path(&vcf, annotation_key, frequency_field)?;
    let samples = reader.samples().len();
    let index = reader.header().layout.index;
    let records = verify_sorted(reader.records())?;
    info!(
        "{}: sorted, {} records, {} samples, {} at annotation index {}",
        vcf.display(),
        records,
        samples,
        frequency_field,
        index
    );
    Ok(())
}
