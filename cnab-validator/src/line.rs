//! Physical lines of a remittance file
//!
//! Input bytes are Latin-1: every byte maps to the Unicode scalar of the same
//! value, so character positions and byte positions coincide.

use std::io::{self, BufRead};

/// Width of every record
pub const RECORD_LENGTH: usize = 400;

/// Longest original line accepted without a length error (two stray
/// terminator bytes)
pub const MAX_TOLERATED_LENGTH: usize = 402;

/// One physical line, normalised to at most [`RECORD_LENGTH`] characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    chars: Vec<char>,
    original_len: usize,
}

impl Line {
    /// Decode a line from Latin-1 bytes (terminator already removed)
    pub fn from_latin1(bytes: &[u8]) -> Self {
        Self::from_chars(bytes.iter().map(|&b| char::from(b)).collect())
    }

    fn from_chars(mut chars: Vec<char>) -> Self {
        let original_len = chars.len();
        chars.truncate(RECORD_LENGTH);
        Self {
            chars,
            original_len,
        }
    }

    /// Length before normalisation
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Length after normalisation
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True for a zero-length line
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// True when the normalised line holds a complete record
    pub fn is_full_length(&self) -> bool {
        self.chars.len() == RECORD_LENGTH
    }

    /// True when the original length is within `400..=402`
    pub fn has_tolerated_length(&self) -> bool {
        (RECORD_LENGTH..=MAX_TOLERATED_LENGTH).contains(&self.original_len)
    }

    /// Record type code (first character)
    pub fn record_type(&self) -> Option<char> {
        self.chars.first().copied()
    }

    /// Text at the 1-based inclusive range `[start, end]`, clipped to the line
    pub fn slice(&self, start: usize, end: usize) -> String {
        let from = start.saturating_sub(1).min(self.chars.len());
        let to = end.min(self.chars.len()).max(from);
        self.chars[from..to].iter().collect()
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Self::from_chars(text.chars().collect())
    }
}

/// Split a byte stream into lines on `\n`, dropping one trailing `\r`
pub fn read_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Line>> {
    reader.split(b'\n').map(|chunk| {
        chunk.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            Line::from_latin1(&bytes)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_decoding_keeps_positions() {
        // "AÇB" in Latin-1
        let line = Line::from_latin1(&[b'A', 0xC7, b'B']);
        assert_eq!(line.len(), 3);
        assert_eq!(line.slice(2, 2), "Ç");
        assert_eq!(line.slice(2, 3), "ÇB");
    }

    #[test]
    fn test_normalisation() {
        let long = "1".repeat(402);
        let line = Line::from(long.as_str());
        assert_eq!(line.original_len(), 402);
        assert_eq!(line.len(), RECORD_LENGTH);
        assert!(line.is_full_length());
        assert!(line.has_tolerated_length());

        let too_long = Line::from("9".repeat(403).as_str());
        assert!(!too_long.has_tolerated_length());

        let short = Line::from("0".repeat(399).as_str());
        assert!(!short.is_full_length());
        assert!(!short.has_tolerated_length());
    }

    #[test]
    fn test_slice_clipped() {
        let line = Line::from("0123");
        assert_eq!(line.slice(3, 6), "23");
        assert_eq!(line.slice(10, 12), "");
    }

    #[test]
    fn test_read_lines_handles_crlf() {
        let data = b"0AB\r\n1CD\n9EF";
        let lines: Vec<Line> = read_lines(&data[..]).collect::<io::Result<_>>().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].slice(1, 3), "0AB");
        assert_eq!(lines[1].original_len(), 3);
        assert_eq!(lines[2].record_type(), Some('9'));
    }

    #[test]
    fn test_trailing_newline_is_not_a_line() {
        let lines: Vec<Line> = read_lines(&b"0AB\n"[..]).collect::<io::Result<_>>().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(read_lines(&b""[..]).count(), 0);
    }
}
