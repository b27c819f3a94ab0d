//! Tab-separated output of shared segments.
//!
//! Uses itoa for integer formatting to avoid allocation per record.

use crate::error::Result;
use crate::segment::OutputRecord;
use std::io::{BufWriter, Write};

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Rendering of an absent flank gap.
pub const NULL_GAP: &[u8] = b"None";

/// Column names, in output order.
pub const COLUMNS: [&str; 11] = [
    "chrom",
    "start",
    "end",
    "num_vars",
    "num_inds",
    "inds",
    "mode",
    "err_left",
    "err_right",
    "n_ultra_rare",
    "label",
];

/// Buffered writer for segment records.
pub struct RecordWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    records_written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            records_written: 0,
        }
    }

    /// Write a `#`-prefixed column header line.
    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_all(b"#")?;
        self.writer.write_all(COLUMNS.join("\t").as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write one record as a tab-separated line.
    pub fn write_record(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer.write_all(record.chrom.as_bytes())?;
        self.write_tab_int(record.start)?;
        self.write_tab_int(record.end)?;
        self.write_tab_int(record.variant_count)?;
        self.write_tab_int(record.shared_individuals)?;

        self.writer.write_all(b"\t")?;
        for (i, id) in record.individuals.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b",")?;
            }
            self.writer.write_all(id.as_bytes())?;
        }

        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.mode.as_str().as_bytes())?;
        self.write_tab_gap(record.left_gap)?;
        self.write_tab_gap(record.right_gap)?;
        self.write_tab_int(record.ultra_rare_count)?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.label.as_bytes())?;
        self.writer.write_all(b"\n")?;

        self.records_written += 1;
        Ok(())
    }

    #[inline]
    fn write_tab_int<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer.write_all(b"\t")?;
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    #[inline]
    fn write_tab_gap(&mut self, gap: Option<u64>) -> Result<()> {
        match gap {
            Some(g) => self.write_tab_int(g),
            None => {
                self.writer.write_all(b"\t")?;
                self.writer.write_all(NULL_GAP)?;
                Ok(())
            }
        }
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
