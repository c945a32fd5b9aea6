//! Terminal escape stripping on top of the `vte` state machine.
//!
//! Network device shells decorate their output with colour codes, cursor
//! movement and carriage returns. Only printable text, newlines and tabs are
//! kept. The parser is stateful, so an escape sequence split across two SSH
//! packets is still removed.

use std::fmt;

use vte::{Parser, Perform};

/// Incremental ANSI/VT100 escape stripper.
pub struct AnsiStripper {
    parser: Parser,
}

impl AnsiStripper {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Feed raw bytes and append the cleaned text to `out`.
    pub fn strip_into(&mut self, data: &[u8], out: &mut Vec<u8>) {
        let mut sink = TextSink { out };
        self.parser.advance(&mut sink, data);
    }
}

impl Default for AnsiStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AnsiStripper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnsiStripper").finish_non_exhaustive()
    }
}

struct TextSink<'a> {
    out: &'a mut Vec<u8>,
}

impl Perform for TextSink<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | b'\t' => self.out.push(byte),
            // Backspace erases the previous character on the terminal.
            0x08 => {
                if self.out.last().is_some_and(|b| *b != b'\n') {
                    self.out.pop();
                }
            }
            _ => {}
        }
    }
}
