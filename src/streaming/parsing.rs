//! Zero-allocation field parsing for VCF and BED lines.
//!
//! These helpers work on raw bytes and never allocate; callers turn the
//! returned slices into owned values only when they keep them.

use memchr::memchr;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Parse BED3 fields using memchr.
///
/// Returns (chrom_bytes, start, end) or None if parsing fails.
#[inline]
pub fn parse_bed3_bytes(line: &[u8]) -> Option<(&[u8], u64, u64)> {
    let tab1 = memchr(b'\t', line)?;
    let chrom = &line[..tab1];

    let rest1 = &line[tab1 + 1..];
    let tab2 = memchr(b'\t', rest1)?;
    let start = parse_u64_fast(&rest1[..tab2])?;

    let rest2 = &rest1[tab2 + 1..];
    let end_len = memchr(b'\t', rest2).unwrap_or(rest2.len());
    let end_len_trimmed = memchr(b'\n', &rest2[..end_len]).unwrap_or(end_len);
    let end = parse_u64_fast(&rest2[..end_len_trimmed])?;

    Some((chrom, start, end))
}

/// Check if a BED line should be skipped (empty, comment, or header).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    line.is_empty() || line[0] == b'#' || line.starts_with(b"track") || line.starts_with(b"browser")
}

/// Strip a trailing `\n` or `\r\n`.
#[inline]
pub fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Value of `key` in a VCF INFO column (`K1=V1;FLAG;K2=V2`).
///
/// Returns None when the key is absent or is a bare flag.
pub fn info_value<'a>(info: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let mut rest = info;
    loop {
        let end = memchr(b';', rest).unwrap_or(rest.len());
        let entry = &rest[..end];
        if let Some(eq) = memchr(b'=', entry) {
            if &entry[..eq] == key {
                return Some(&entry[eq + 1..]);
            }
        }
        if end == rest.len() {
            return None;
        }
        rest = &rest[end + 1..];
    }
}

/// Index of `key` among the colon-separated FORMAT keys.
pub fn format_key_index(format: &[u8], key: &[u8]) -> Option<usize> {
    format.split(|&b| b == b':').position(|k| k == key)
}

/// The `index`-th colon-separated value of a sample column.
///
/// Trailing fields may be dropped in VCF sample columns, so a short column
/// yields None.
#[inline]
pub fn sample_field(sample: &[u8], index: usize) -> Option<&[u8]> {
    sample.split(|&b| b == b':').nth(index)
}
