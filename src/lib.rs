//! rarehap: rare shared haplotype segment scanner
//!
//! This library finds genomic segments where several individuals share a run
//! of rare variants, reading a sorted multi-sample VCF in a single pass.
//!
//! # Features
//!
//! - **Streaming I/O**: memory bounded by the largest variant cluster
//! - **Parallel processing**: optional per-chromosome scanning with Rayon
//! - **Plain or compressed input**: gzip/bgzip VCFs are detected automatically
//!
//! # Example
//!
//! ```rust,no_run
//! use rarehap::{commands::ScanCommand, config::ScanConfig, regions::GeneRegionSet};
//!
//! let config = ScanConfig::new().with_min_variants(5);
//! let regions = GeneRegionSet::load("gene_data.csv", config.region_padding).unwrap();
//!
//! let cmd = ScanCommand::new().with_config(config);
//! let mut out = std::io::stdout();
//! let stats = cmd.run("cohort.vcf.gz", &regions, &mut out).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod annotation;
pub mod carrier;
pub mod cluster;
pub mod commands;
pub mod config;
pub mod error;
pub mod parallel;
pub mod regions;
pub mod segment;
pub mod streaming;
pub mod variant;
pub mod vcf;

// Re-export commonly used types
pub use annotation::{Annotation, CsqLayout, Frequency};
pub use carrier::CarrierSet;
pub use cluster::{ClusterAccumulator, FlushedCluster};
pub use config::ScanConfig;
pub use error::{Result, ScanError};
pub use regions::{GeneRegion, GeneRegionSet};
pub use segment::{Mode, OutputRecord, SegmentEmitter};
pub use variant::{Genotype, GenotypeClass, Variant};
pub use vcf::VcfReader;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{ScanCommand, ScanStats};
    pub use crate::config::ScanConfig;
    pub use crate::error::{Result, ScanError};
    pub use crate::regions::{GeneRegion, GeneRegionSet};
    pub use crate::segment::{Mode, OutputRecord};
    pub use crate::variant::{Genotype, Variant};
    pub use crate::vcf::VcfReader;
}
