//! Allocation-free scanning of unsigned integers out of pseudo-file text.
//!
//! The scanner walks byte offsets into a caller-owned buffer and never builds
//! substrings. Kernel pseudo-files are ASCII, so byte offsets are also valid
//! `str` boundaries wherever a token starts or ends.

/// One unsigned integer token found by [`next_number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedNumber {
    /// Decimal value of the token.
    pub value: u64,
    /// Offset of the first byte after the token, or `None` if the token ran to the
    /// end of the span.
    pub next: Option<usize>,
}

/// Scans the next unsigned decimal integer in `span`, starting at `start`.
///
/// Leading whitespace is skipped, then a maximal run of ASCII digits is consumed.
/// A leading `-` is not a sign: callers check for the cgroup `-1` sentinel
/// themselves before scanning.
///
/// Returns `None` if no digit follows the whitespace. Values that overflow `u64`
/// wrap; the file formats scanned here keep values in range.
///
/// # Example
///
/// ```rust
/// use resource_sensor::stats::scanner::{next_number, ScannedNumber};
///
/// let line = "cpu  10 20";
/// let first = next_number(line, 3).unwrap();
/// assert_eq!(first, ScannedNumber { value: 10, next: Some(7) });
/// let second = next_number(line, 7).unwrap();
/// assert_eq!(second, ScannedNumber { value: 20, next: None });
/// ```
pub fn next_number(span: &str, start: usize) -> Option<ScannedNumber> {
    let bytes = span.as_bytes();
    let mut pos = start;

    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }

    let mut value: u64 = 0;
    let mut digits = 0usize;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        value = value
            .wrapping_mul(10)
            .wrapping_add(u64::from(bytes[pos] - b'0'));
        digits += 1;
        pos += 1;
    }

    if digits == 0 {
        return None;
    }

    Some(ScannedNumber {
        value,
        next: (pos < bytes.len()).then_some(pos),
    })
}

/// Returns the text after `offset`, or `""` when the scan already reached the end.
#[inline]
pub fn remainder(span: &str, offset: Option<usize>) -> &str {
    offset.and_then(|o| span.get(o..)).unwrap_or("")
}

/// True if nothing but whitespace follows `offset`.
#[inline]
pub fn is_exhausted(span: &str, offset: Option<usize>) -> bool {
    remainder(span, offset).trim().is_empty()
}

/// True if the token ending at `offset` is followed by whitespace or the end of the span.
#[inline]
pub fn ends_token(span: &str, offset: Option<usize>) -> bool {
    offset.is_none_or(|o| span.as_bytes().get(o).is_none_or(u8::is_ascii_whitespace))
}

/// True for an empty file or the cgroup `-1` "unset" sentinel.
#[inline]
pub fn is_unset(content: &str) -> bool {
    matches!(content.trim(), "" | "-1")
}
