//! Padded gene regions used as the overlap filter.
//!
//! Regions are padded once at load time and indexed per chromosome. Overlap
//! uses closed coordinates: a segment touching a padded boundary overlaps.

use crate::error::{Result, ScanError};
use crate::streaming::parsing::{parse_bed3_bytes, should_skip_line};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Padding added on both sides of each gene region.
pub const DEFAULT_REGION_PADDING: u64 = 10_000;

/// CSV column holding the chromosome name.
pub const CHROM_COLUMN: &str = "chromosome_name";
/// CSV column holding the gene start.
pub const START_COLUMN: &str = "start_position";
/// CSV column holding the gene end.
pub const END_COLUMN: &str = "end_position";

/// Strip a leading `chr` so `chr7` and `7` name the same chromosome.
#[inline]
pub fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// A padded gene region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRegion {
    /// Normalized chromosome name.
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl GeneRegion {
    /// Pad a raw `[start, end]` region and normalize its chromosome.
    pub fn padded(chrom: &str, start: u64, end: u64, padding: u64) -> Self {
        Self {
            chrom: normalize_chrom(chrom).to_string(),
            start: start.saturating_sub(padding),
            end: end.saturating_add(padding),
        }
    }

    /// Closed-interval overlap with `[start, end]`.
    #[inline]
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        !(end < self.start || start > self.end)
    }
}

/// Regions of one chromosome, sorted by start, with a running maximum of
/// ends so a single binary search answers "does anything overlap".
#[derive(Debug, Default)]
struct ChromRegions {
    regions: Vec<GeneRegion>,
    max_end: Vec<u64>,
}

impl ChromRegions {
    fn finish(&mut self) {
        self.regions
            .sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        let mut running = 0;
        self.max_end = self
            .regions
            .iter()
            .map(|r| {
                running = running.max(r.end);
                running
            })
            .collect();
    }

    fn overlaps(&self, start: u64, end: u64) -> bool {
        // regions[..n] all start at or before `end`
        let n = self.regions.partition_point(|r| r.start <= end);
        n > 0 && self.max_end[n - 1] >= start
    }
}

/// Immutable set of padded gene regions.
#[derive(Debug, Default)]
pub struct GeneRegionSet {
    by_chrom: FxHashMap<String, ChromRegions>,
    len: usize,
}

impl GeneRegionSet {
    /// Build a set from already padded regions.
    pub fn from_regions(regions: Vec<GeneRegion>) -> Self {
        let len = regions.len();
        let mut by_chrom: FxHashMap<String, ChromRegions> = FxHashMap::default();
        for region in regions {
            by_chrom
                .entry(region.chrom.clone())
                .or_default()
                .regions
                .push(region);
        }
        for chrom_regions in by_chrom.values_mut() {
            chrom_regions.finish();
        }
        Self { by_chrom, len }
    }

    /// Load regions, choosing BED or CSV by file extension.
    pub fn load<P: AsRef<Path>>(path: P, padding: u64) -> Result<Self> {
        let path = path.as_ref();
        let is_bed = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bed"));
        if is_bed {
            Self::from_bed_path(path, padding)
        } else {
            Self::from_csv_path(path, padding)
        }
    }

    /// Load a CSV gene table with `chromosome_name`, `start_position` and
    /// `end_position` columns.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, padding: u64) -> Result<Self> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv_reader(reader, padding)
    }

    /// Parse a CSV gene table from any reader.
    pub fn from_csv_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        padding: u64,
    ) -> Result<Self> {
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
                ScanError::InvalidFormat(format!("Gene table is missing column '{}'", name))
            })
        };
        let (chrom_col, start_col, end_col) =
            (column(CHROM_COLUMN)?, column(START_COLUMN)?, column(END_COLUMN)?);

        let mut regions = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            // header occupies line 1
            let line = row + 2;
            let field = |col: usize| record.get(col).unwrap_or("").trim();
            let start = parse_coordinate(field(start_col), START_COLUMN, line)?;
            let end = parse_coordinate(field(end_col), END_COLUMN, line)?;
            regions.push(GeneRegion::padded(field(chrom_col), start, end, padding));
        }
        Ok(Self::from_regions(regions))
    }

    /// Load a BED file (chrom, start, end).
    pub fn from_bed_path<P: AsRef<Path>>(path: P, padding: u64) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_bed_reader(BufReader::new(file), padding)
    }

    /// Parse BED regions from any buffered reader.
    pub fn from_bed_reader<R: BufRead>(reader: R, padding: u64) -> Result<Self> {
        let mut regions = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let bytes = line.trim_end().as_bytes();
            if should_skip_line(bytes) {
                continue;
            }
            let (chrom, start, end) = parse_bed3_bytes(bytes).ok_or_else(|| ScanError::Parse {
                line: idx + 1,
                message: format!("Expected chrom, start and end: '{}'", line),
            })?;
            let chrom = String::from_utf8_lossy(chrom);
            regions.push(GeneRegion::padded(&chrom, start, end, padding));
        }
        Ok(Self::from_regions(regions))
    }

    /// True if `[start, end]` on `chrom` overlaps at least one padded region.
    ///
    /// `chrom` is normalized before lookup.
    pub fn overlaps(&self, chrom: &str, start: u64, end: u64) -> bool {
        self.by_chrom
            .get(normalize_chrom(chrom))
            .is_some_and(|r| r.overlaps(start, end))
    }

    /// Number of regions loaded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Chromosomes with at least one region (normalized names).
    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.by_chrom.keys()
    }
}

fn parse_coordinate(value: &str, column: &str, line: usize) -> Result<u64> {
    value.parse().map_err(|_| ScanError::Parse {
        line,
        message: format!("Invalid {} value: '{}'", column, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(chrom: &str, start: u64, end: u64) -> GeneRegionSet {
        GeneRegionSet::from_regions(vec![GeneRegion::padded(chrom, start, end, 0)])
    }

    #[test]
    fn test_normalize_chrom() {
        assert_eq!(normalize_chrom("chr7"), "7");
        assert_eq!(normalize_chrom("7"), "7");
        assert_eq!(normalize_chrom("chrX"), "X");
    }

    #[test]
    fn test_padding_saturates_at_zero() {
        let r = GeneRegion::padded("chr1", 5_000, 20_000, DEFAULT_REGION_PADDING);
        assert_eq!(r.chrom, "1");
        assert_eq!(r.start, 0);
        assert_eq!(r.end, 30_000);
    }

    #[test]
    fn test_touching_boundaries() {
        let set = single("1", 1_000, 2_000);
        // block ends exactly on region start
        assert!(set.overlaps("1", 500, 1_000));
        // block starts exactly on region end
        assert!(set.overlaps("1", 2_000, 2_500));
        // block starts one past region end
        assert!(!set.overlaps("1", 2_001, 2_500));
        assert!(!set.overlaps("1", 100, 999));
    }

    #[test]
    fn test_chrom_prefix_is_ignored() {
        let set = single("chr2", 100, 200);
        assert!(set.overlaps("chr2", 150, 160));
        assert!(set.overlaps("2", 150, 160));
        assert!(!set.overlaps("chr3", 150, 160));
    }

    #[test]
    fn test_long_region_behind_short_ones() {
        let set = GeneRegionSet::from_regions(vec![
            GeneRegion::padded("1", 100, 10_000, 0),
            GeneRegion::padded("1", 200, 300, 0),
            GeneRegion::padded("1", 400, 500, 0),
        ]);
        assert!(set.overlaps("1", 5_000, 6_000));
        assert!(!set.overlaps("1", 10_001, 20_000));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_csv_loader() {
        let content = "gene,chromosome_name,start_position,end_position\n\
                       INS,11,2159779,2161209\n\
                       GCK,chr7,44143000,44200000\n";
        let reader = csv::Reader::from_reader(content.as_bytes());
        let set = GeneRegionSet::from_csv_reader(reader, 10_000).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.overlaps("chr11", 2_149_779, 2_149_779));
        assert!(!set.overlaps("chr11", 2_149_000, 2_149_778));
        assert!(set.overlaps("7", 44_210_000, 44_300_000));
    }

    #[test]
    fn test_csv_missing_column() {
        let reader = csv::Reader::from_reader("chrom,start,end\n1,2,3\n".as_bytes());
        let err = GeneRegionSet::from_csv_reader(reader, 0).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFormat(_)));
    }

    #[test]
    fn test_csv_bad_coordinate() {
        let content = "chromosome_name,start_position,end_position\n1,abc,3\n";
        let reader = csv::Reader::from_reader(content.as_bytes());
        let err = GeneRegionSet::from_csv_reader(reader, 0).unwrap_err();
        assert!(matches!(err, ScanError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_bed_loader() {
        let content = "# genes\ntrack name=x\nchr1\t100\t200\tGENE\n\nchr2\t50\t60\n";
        let set = GeneRegionSet::from_bed_reader(content.as_bytes(), 10).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.overlaps("1", 205, 210));
        assert!(!set.overlaps("1", 211, 300));
        let mut chroms: Vec<_> = set.chromosomes().cloned().collect();
        chroms.sort();
        assert_eq!(chroms, vec!["1", "2"]);
    }

    #[test]
    fn test_bed_loader_rejects_short_line() {
        let err = GeneRegionSet::from_bed_reader("chr1\t100\n".as_bytes(), 0).unwrap_err();
        assert!(matches!(err, ScanError::Parse { line: 1, .. }));
    }
}
