//! Streaming utilities shared by the scan commands.
//!
//! - Zero-allocation VCF/BED field parsing
//! - Sort validation
//! - Buffered record output

pub mod output;
pub mod parsing;
pub mod validation;

pub use output::RecordWriter;
pub use parsing::{info_value, parse_bed3_bytes, parse_u64_fast, should_skip_line};
pub use validation::{verify_sorted, SortValidator};
