//! Pattern buffer with tail-search optimization.
//!
//! Only the last N bytes of the accumulated output are searched for prompt
//! patterns. A full `show running-config` can run to megabytes, while the
//! prompt is always at the very end.

use std::borrow::Cow;
use std::fmt;

use regex::bytes::Regex;

use super::ansi::AnsiStripper;

/// Buffer for accumulating shell output and searching its tail for prompts.
pub struct PatternBuffer {
    /// The accumulated, escape-stripped output.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    stripper: AnsiStripper,
}

impl PatternBuffer {
    /// Create a new pattern buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            stripper: AnsiStripper::new(),
        }
    }

    /// Extend the buffer with new data, stripping terminal escapes.
    pub fn extend(&mut self, data: &[u8]) {
        self.stripper.strip_into(data, &mut self.buffer);
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.tail())
    }

    /// The last line of the buffer (text after the final newline).
    pub fn last_line(&self) -> Cow<'_, str> {
        let start = memchr::memrchr(b'\n', &self.buffer).map_or(0, |pos| pos + 1);
        String::from_utf8_lossy(&self.buffer[start..])
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
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
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.take(), b"Green text");
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_prompt_outside_tail_is_ignored() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_last_line() {
        let mut buffer = PatternBuffer::default();
        buffer.extend(b"Building configuration...\r\nhostname r1\r\nr1#");
        assert_eq!(buffer.last_line(), "r1#");

        buffer.take();
        buffer.extend(b"r1>");
        assert_eq!(buffer.last_line(), "r1>");
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.take().is_empty());
    }
}
