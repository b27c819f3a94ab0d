//! End-to-end scan scenarios through the library API and the binary.
//!
//! Tests cover:
//! 1. Homozygous shared cluster inside a gene
//! 2. Chromosome change in the middle of a cluster
//! 3. Serial/parallel equivalence and rerun idempotence
//! 4. Fatal header problems
//! 5. Compressed input and BED region files

use flate2::write::GzEncoder;
use flate2::Compression;
use rarehap::commands::ScanCommand;
use rarehap::config::ScanConfig;
use rarehap::error::ScanError;
use rarehap::regions::GeneRegionSet;
use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

/// Helper to create a temporary file with the given suffix.
fn create_file(suffix: &str, content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

/// Helper to run the rarehap binary and return output.
fn run_rarehap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rarehap"))
        .args(args)
        .output()
        .expect("Failed to run rarehap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// =============================================================================
// Test fixtures
// =============================================================================

const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|GnomAD_v4_1_AF_popmax\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tI1\tI2\tI3\tI4\n";

const HOM_TRIO: &str = "1/1\t1/1\t1|1\t0/0";
const LONE_HET: &str = "0/0\t0/0\t./.\t0/1";

fn vcf_line(chrom: &str, pos: u64, genotypes: &str) -> String {
    format!(
        "{}\t{}\t.\tC\tT\t50\tPASS\tDP=30;CSQ=T|missense_variant|MODERATE|0.00001,T|intron_variant|MODIFIER|0.2\tGT:DP\t{}\n",
        chrom,
        pos,
        genotypes
            .split('\t')
            .map(|gt| format!("{}:30", gt))
            .collect::<Vec<_>>()
            .join("\t")
    )
}

/// Nine homozygous variants shared by I1-I3 within 100bp on chr1.
fn single_cluster_vcf() -> String {
    let mut text = HEADER.to_string();
    for i in 0..9 {
        text.push_str(&vcf_line("chr1", 1000 + i * 10, HOM_TRIO));
    }
    text
}

/// A shared run crossing from chr1 to chr2 with lone variants on each side.
fn chromosome_change_vcf() -> String {
    let mut text = HEADER.to_string();
    text.push_str(&vcf_line("chr1", 10, LONE_HET));
    for i in 0..5 {
        text.push_str(&vcf_line("chr1", 5000 + i * 10, HOM_TRIO));
    }
    for i in 0..5 {
        text.push_str(&vcf_line("chr2", 5050 + i * 10, HOM_TRIO));
    }
    text.push_str(&vcf_line("chr2", 20000, LONE_HET));
    text
}

const GENES_CSV: &str = "ensembl_gene_id,chromosome_name,start_position,end_position\n\
ENSG01,1,900,1200\n\
ENSG02,1,4000,6000\n\
ENSG03,2,4000,6000\n";

fn scenario_config() -> ScanConfig {
    ScanConfig::new()
        .with_individuals(2, None)
        .with_min_variants(5)
        .with_min_ultra_rare(0)
}

fn scan(vcf: &str, parallel: bool) -> String {
    let vcf_file = create_file(".vcf", vcf.as_bytes());
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let config = scenario_config();
    let regions = GeneRegionSet::load(genes.path(), config.region_padding).unwrap();
    let cmd = ScanCommand::new().with_config(config);

    let mut out = Vec::new();
    if parallel {
        cmd.run_parallel(vcf_file.path(), &regions, &mut out).unwrap();
    } else {
        cmd.run(vcf_file.path(), &regions, &mut out).unwrap();
    }
    String::from_utf8(out).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_shared_homozygous_cluster() {
    let out = scan(&single_cluster_vcf(), false);
    assert_eq!(
        out,
        "chr1\t1000\t1080\t9\t3\tI1,I2,I3\tdouble\tNone\tNone\t9\tULTRA_RARE\n"
    );
}

#[test]
fn test_chromosome_change_mid_cluster() {
    let out = scan(&chromosome_change_vcf(), false);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "chr1\t5000\t5040\t5\t3\tI1,I2,I3\tdouble\t4990\tNone\t5\tULTRA_RARE",
            "chr2\t5050\t5090\t5\t3\tI1,I2,I3\tdouble\tNone\t14910\t5\tULTRA_RARE",
        ]
    );
}

#[test]
fn test_parallel_matches_serial() {
    let vcf = chromosome_change_vcf();
    assert_eq!(scan(&vcf, false), scan(&vcf, true));
}

#[test]
fn test_rerun_is_identical() {
    let vcf = chromosome_change_vcf();
    let first = scan(&vcf, false);
    let second = scan(&vcf, false);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_stats_counts() {
    let vcf_file = create_file(".vcf", chromosome_change_vcf().as_bytes());
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let regions = GeneRegionSet::load(genes.path(), 10_000).unwrap();
    let cmd = ScanCommand::new().with_config(scenario_config());

    let mut out = Vec::new();
    let stats = cmd.run(vcf_file.path(), &regions, &mut out).unwrap();
    assert_eq!(stats.variants_read, 12);
    assert_eq!(stats.records_written, 2);
    assert_eq!(stats.filters.clusters, 4);
    assert_eq!(stats.filters.singleton_clusters, 2);
    assert_eq!(stats.malformed_genotypes, 0);
}

#[test]
fn test_gene_filter_rejects_distant_cluster() {
    let mut text = HEADER.to_string();
    for i in 0..9 {
        text.push_str(&vcf_line("chr7", 1000 + i * 10, HOM_TRIO));
    }
    assert_eq!(scan(&text, false), "");
}

// =============================================================================
// Header problems
// =============================================================================

#[test]
fn test_missing_frequency_field_is_fatal() {
    let text = single_cluster_vcf().replace("GnomAD_v4_1_AF_popmax", "gnomAD_AF");
    let vcf_file = create_file(".vcf", text.as_bytes());
    let regions = GeneRegionSet::default();
    let mut out = Vec::new();

    let err = ScanCommand::new()
        .run(vcf_file.path(), &regions, &mut out)
        .unwrap_err();
    assert!(matches!(err, ScanError::MissingAnnotationField { .. }));
    assert!(out.is_empty());
}

#[test]
fn test_custom_frequency_field() {
    let text = single_cluster_vcf().replace("GnomAD_v4_1_AF_popmax", "gnomAD_AF");
    let vcf_file = create_file(".vcf", text.as_bytes());
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let config = scenario_config().with_annotation("CSQ", "gnomAD_AF");
    let regions = GeneRegionSet::load(genes.path(), config.region_padding).unwrap();

    let mut out = Vec::new();
    let stats = ScanCommand::new()
        .with_config(config)
        .run(vcf_file.path(), &regions, &mut out)
        .unwrap();
    assert_eq!(stats.records_written, 1);
}

// =============================================================================
// Input formats
// =============================================================================

#[test]
fn test_gzip_input_matches_plain() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(chromosome_change_vcf().as_bytes())
        .unwrap();
    let compressed = encoder.finish().unwrap();

    let vcf_file = create_file(".vcf.gz", &compressed);
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let regions = GeneRegionSet::load(genes.path(), 10_000).unwrap();
    let mut out = Vec::new();
    ScanCommand::new()
        .with_config(scenario_config())
        .run(vcf_file.path(), &regions, &mut out)
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), scan(&chromosome_change_vcf(), false));
}

#[test]
fn test_bed_regions() {
    let vcf_file = create_file(".vcf", single_cluster_vcf().as_bytes());
    let genes = create_file(".bed", b"track name=genes\nchr1\t900\t1200\n");
    let regions = GeneRegionSet::load(genes.path(), 0).unwrap();
    let mut out = Vec::new();
    let stats = ScanCommand::new()
        .with_config(scenario_config())
        .run(vcf_file.path(), &regions, &mut out)
        .unwrap();
    assert_eq!(stats.records_written, 1);
}

// =============================================================================
// Binary
// =============================================================================

#[test]
fn test_cli_scan() {
    let vcf_file = create_file(".vcf", single_cluster_vcf().as_bytes());
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let output = run_rarehap(&[
        "scan",
        vcf_file.path().to_str().unwrap(),
        "--regions",
        genes.path().to_str().unwrap(),
        "--min-variants",
        "5",
        "--min-ultra-rare",
        "0",
        "--header",
        "--quiet",
    ]);
    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("#chrom"));
    assert!(lines[1].starts_with("chr1\t1000\t1080\t9\t3\tI1,I2,I3\tdouble"));
}

#[test]
fn test_cli_parallel_output_file_matches_serial_stdout() {
    let vcf_file = create_file(".vcf", chromosome_change_vcf().as_bytes());
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let out_file = NamedTempFile::new().unwrap();
    let vcf_path = vcf_file.path().to_str().unwrap();
    let genes_path = genes.path().to_str().unwrap();
    let filters = ["--min-variants", "5", "--min-ultra-rare", "0"];

    let mut serial_args = vec!["scan", vcf_path, "--regions", genes_path];
    serial_args.extend(filters);
    let serial = run_rarehap(&serial_args);
    assert!(serial.status.success());

    let mut parallel_args = vec![
        "scan",
        vcf_path,
        "--regions",
        genes_path,
        "--parallel",
        "--stats",
        "--threads",
        "2",
        "--output",
        out_file.path().to_str().unwrap(),
    ];
    parallel_args.extend(filters);
    let parallel = run_rarehap(&parallel_args);
    assert!(parallel.status.success());
    assert!(parallel.stdout.is_empty());
    assert!(String::from_utf8_lossy(&parallel.stderr).contains("Scan stats"));

    let written = std::fs::read_to_string(out_file.path()).unwrap();
    assert_eq!(written.lines().count(), 2);
    assert_eq!(written, stdout(&serial));
}

#[test]
fn test_cli_rejects_unsorted() {
    let mut text = HEADER.to_string();
    text.push_str(&vcf_line("chr1", 2000, HOM_TRIO));
    text.push_str(&vcf_line("chr1", 1000, HOM_TRIO));
    let vcf_file = create_file(".vcf", text.as_bytes());

    let output = run_rarehap(&["validate", vcf_file.path().to_str().unwrap(), "--quiet"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_validate_sorted() {
    let vcf_file = create_file(".vcf", chromosome_change_vcf().as_bytes());
    let output = run_rarehap(&["validate", vcf_file.path().to_str().unwrap()]);
    assert!(output.status.success());
}

#[test]
fn test_cli_rejects_bad_fraction() {
    let vcf_file = create_file(".vcf", single_cluster_vcf().as_bytes());
    let genes = create_file(".csv", GENES_CSV.as_bytes());
    let output = run_rarehap(&[
        "scan",
        vcf_file.path().to_str().unwrap(),
        "--regions",
        genes.path().to_str().unwrap(),
        "--carrier-fraction",
        "1.5",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
