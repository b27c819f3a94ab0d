//! Streaming VCF reader.
//!
//! Reads plain or gzip/bgzip-compressed VCF text, resolving the population
//! frequency field from the header once and decoding each record into a
//! [`Variant`] with genotypes and a pre-parsed [`Annotation`].

use crate::annotation::{Annotation, CsqLayout};
use crate::error::{Result, ScanError};
use crate::streaming::parsing::{
    format_key_index, info_value, parse_u64_fast, sample_field, trim_newline,
};
use crate::variant::{Genotype, Variant};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Mandatory VCF columns before FORMAT.
const FIXED_COLUMNS: usize = 8;

/// Header information needed by the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfHeader {
    /// Sample ids in column order.
    pub samples: Vec<String>,
    /// Resolved annotation layout.
    pub layout: CsqLayout,
}

/// A streaming VCF reader.
pub struct VcfReader<R: Read> {
    reader: BufReader<R>,
    header: VcfHeader,
    line_number: usize,
    buffer: Vec<u8>,
    malformed_genotypes: usize,
}

impl VcfReader<Box<dyn Read>> {
    /// Open a VCF file, transparently decompressing gzip/bgzip input.
    pub fn from_path<P: AsRef<Path>>(path: P, key: &str, field: &str) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(open_maybe_gzip(file)?, key, field)
    }
}

/// Wrap `source` in a gzip decoder if it starts with the gzip magic bytes.
pub fn open_maybe_gzip<R: Read + 'static>(source: R) -> io::Result<Box<dyn Read>> {
    let mut buffered = BufReader::new(source);
    if is_gzip(buffered.fill_buf()?) {
        Ok(Box::new(MultiGzDecoder::new(buffered)))
    } else {
        Ok(Box::new(buffered))
    }
}

impl<R: Read> VcfReader<R> {
    /// Create a reader and consume the header.
    ///
    /// `key` is the INFO key holding consequence annotations and `field` the
    /// frequency field within them; both must be declared in the header.
    pub fn new(source: R, key: &str, field: &str) -> Result<Self> {
        let mut reader = BufReader::new(source);
        let mut line = String::new();
        let mut line_number = 0;
        let mut description: Option<String> = None;
        let info_prefix = format!("##INFO=<ID={},", key);

        let samples = loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(ScanError::InvalidFormat(
                    "VCF header has no #CHROM line".to_string(),
                ));
            }
            line_number += 1;
            let trimmed = line.trim_end();

            if trimmed.starts_with(&info_prefix) {
                description = header_description(trimmed);
            } else if trimmed.starts_with("#CHROM") {
                break trimmed
                    .split('\t')
                    .skip(FIXED_COLUMNS + 1)
                    .map(str::to_string)
                    .collect::<Vec<_>>();
            } else if !trimmed.starts_with("##") {
                return Err(ScanError::Parse {
                    line: line_number,
                    message: "Expected a header line before the #CHROM line".to_string(),
                });
            }
        };

        let description =
            description.ok_or_else(|| ScanError::MissingAnnotationHeader(key.to_string()))?;
        let layout = CsqLayout::from_description(&description, key, field)?;

        Ok(Self {
            reader,
            header: VcfHeader { samples, layout },
            line_number,
            buffer: Vec::with_capacity(4096),
            malformed_genotypes: 0,
        })
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    pub fn samples(&self) -> &[String] {
        &self.header.samples
    }

    /// Sample columns that carried no GT value and were read as missing.
    pub fn malformed_genotypes(&self) -> usize {
        self.malformed_genotypes
    }

    /// Read the next variant record.
    pub fn read_variant(&mut self) -> Result<Option<Variant>> {
        loop {
            self.buffer.clear();
            if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = trim_newline(&self.buffer);
            if line.is_empty() || line[0] == b'#' {
                continue;
            }

            let (variant, malformed) = parse_record(line, &self.header, self.line_number)?;
            self.malformed_genotypes += malformed;
            return Ok(Some(variant));
        }
    }

    /// Get an iterator over all variants.
    pub fn records(self) -> VariantIter<R> {
        VariantIter { reader: self }
    }
}

/// Iterator over VCF variants.
pub struct VariantIter<R: Read> {
    reader: VcfReader<R>,
}

impl<R: Read> Iterator for VariantIter<R> {
    type Item = Result<Variant>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_variant().transpose()
    }
}

/// Extract the quoted `Description` value of a header line.
fn header_description(line: &str) -> Option<String> {
    let (_, rest) = line.split_once("Description=\"")?;
    let end = rest.rfind('"')?;
    Some(rest[..end].to_string())
}

/// Decode one data line, returning the variant and the number of sample
/// columns without a GT value.
fn parse_record(line: &[u8], header: &VcfHeader, line_number: usize) -> Result<(Variant, usize)> {
    let parse_error = |message: String| ScanError::Parse {
        line: line_number,
        message,
    };

    let mut columns = line.split(|&b| b == b'\t');
    let mut fixed: [&[u8]; FIXED_COLUMNS] = [&[]; FIXED_COLUMNS];
    for (i, slot) in fixed.iter_mut().enumerate() {
        *slot = columns
            .next()
            .ok_or_else(|| parse_error(format!("Expected at least 8 columns, got {}", i)))?;
    }

    let chrom = String::from_utf8_lossy(fixed[0]).into_owned();
    let pos = parse_u64_fast(fixed[1]).ok_or_else(|| {
        parse_error(format!(
            "Invalid position: '{}'",
            String::from_utf8_lossy(fixed[1])
        ))
    })?;

    let layout = &header.layout;
    let annotation = match info_value(fixed[7], layout.key.as_bytes()) {
        Some(raw) => Annotation::parse(&String::from_utf8_lossy(raw), layout.index),
        None => Annotation::empty(),
    };

    let mut genotypes = Vec::with_capacity(header.samples.len());
    let mut malformed = 0;
    if let Some(format) = columns.next() {
        let gt_index = format_key_index(format, b"GT")
            .ok_or_else(|| parse_error("FORMAT column has no GT key".to_string()))?;
        for sample in columns {
            match sample_field(sample, gt_index) {
                Some(gt) => genotypes.push(Genotype::parse(gt)),
                None => {
                    malformed += 1;
                    genotypes.push(Genotype::MISSING);
                }
            }
        }
    }

    if genotypes.len() != header.samples.len() {
        return Err(parse_error(format!(
            "Expected {} sample columns, got {}",
            header.samples.len(),
            genotypes.len()
        )));
    }

    Ok((Variant::new(chrom, pos, genotypes, annotation), malformed))
}

/// Check whether `bytes` look like the start of a gzip stream.
#[inline]
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}
