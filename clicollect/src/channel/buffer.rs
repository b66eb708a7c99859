//! Per-command capture buffer with ANSI stripping and tail search.
//!
//! Prompt and pager markers only ever appear at the end of the output, so
//! prompt checks look at the last `search_depth` bytes instead of the whole
//! buffer. For large outputs this matters.

use std::fmt;

use vte::{Parser, Perform};

/// Keeps printable text and line controls, drops escape sequences.
struct AnsiStripper<'a> {
    out: &'a mut Vec<u8>,
}

impl Perform for AnsiStripper<'_> {
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

/// Buffer for accumulating one command's output.
///
/// The escape-sequence parser lives as long as the buffer, so a sequence
/// split across two chunks is still removed.
pub struct CaptureBuffer {
    /// Cleaned output.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Bytes received before cleaning.
    raw_len: usize,

    parser: Parser,
}

impl CaptureBuffer {
    /// Create a new buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            raw_len: 0,
            parser: Parser::new(),
        }
    }

    /// Append received bytes, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        self.raw_len += data.len();
        let mut stripper = AnsiStripper {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut stripper, data);
    }

    /// The last `search_depth` bytes.
    pub fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    /// Remove `needle` if it ends the buffer, ignoring trailing whitespace.
    /// Returns whether it was removed. Output before the marker is kept.
    pub fn strip_trailing(&mut self, needle: &[u8]) -> bool {
        if needle.is_empty() {
            return false;
        }
        let end = self
            .buffer
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |pos| pos + 1);
        if !self.buffer[..end].ends_with(needle) {
            return false;
        }
        self.buffer.truncate(end - needle.len());
        true
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.raw_len = 0;
        std::mem::take(&mut self.buffer)
    }

    /// Total bytes fed in, before ANSI stripping.
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }
}

impl fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("len", &self.buffer.len())
            .field("raw_len", &self.raw_len)
            .field("search_depth", &self.search_depth)
            .finish()
    }
}
