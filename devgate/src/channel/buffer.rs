//! Output buffer with tail-only prompt search.
//!
//! Prompts always sit at the end of the output, so only the last
//! `search_depth` bytes are searched. Large outputs (full routing tables,
//! running configs) stay cheap to scan after every chunk.

use std::fmt;

use regex::bytes::{Match, Regex};
use vte::{Parser, Perform};

/// Default number of trailing bytes searched for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Keeps printable text and line control, drops escape sequences.
#[derive(Default)]
struct Printable {
    out: Vec<u8>,
}

impl Perform for Printable {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}

/// Accumulated terminal output with ANSI escapes removed.
///
/// The escape parser lives as long as the buffer, so a sequence split across
/// two reads is still stripped.
pub struct PatternBuffer {
    buffer: Vec<u8>,
    search_depth: usize,
    parser: Parser,
    printable: Printable,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
            printable: Printable::default(),
        }
    }

    /// Append raw output, stripping escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        self.parser.advance(&mut self.printable, data);
        self.buffer.append(&mut self.printable.out);
    }

    /// Search the last `search_depth` bytes.
    ///
    /// Offsets in the returned match are relative to the tail, not the buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<Match<'_>> {
        pattern.find(self.tail())
    }

    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    /// Take everything accumulated so far and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }

    fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_slice(), b"Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Green text");
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"line one\x1b[");
        buffer.extend(b"2Kline two");
        assert_eq!(buffer.as_slice(), b"line oneline two");
    }

    #[test]
    fn test_line_control_kept() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"a\r\n\tb\x07");
        assert_eq!(buffer.as_slice(), b"a\r\n\tb");
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.search_tail(&pattern).is_some());
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_take_resets() {
        let mut buffer = PatternBuffer::default();
        buffer.extend(b"output");
        assert_eq!(buffer.take(), b"output");
        assert!(buffer.is_empty());
        assert_eq!(buffer.search_depth(), DEFAULT_SEARCH_DEPTH);
    }
}
