//! Error type shared by the reader, the region loader and the scan.

use std::io;
use thiserror::Error;

/// Errors that can occur while scanning a cohort.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("INFO field '{0}' is not declared in the VCF header")]
    MissingAnnotationHeader(String),

    #[error("Required {key} field '{field}' not found in VCF header")]
    MissingAnnotationField { key: String, field: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
