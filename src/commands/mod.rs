//! Command implementations for rarehap.

pub mod scan;

pub use crate::streaming::verify_sorted;
pub use scan::{scan_variants, ScanCommand, ScanStats};
