//! Prompt-aware wrapper around an interactive shell.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use tokio::time::Instant;

use super::ShellChannel;
use super::buffer::PatternBuffer;
use crate::error::ChannelError;

/// Default number of trailing bytes searched for a prompt.
const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// High-level channel for interactive device sessions.
///
/// Wraps a [`ShellChannel`] and provides pattern-based reads, each bounded
/// by its own deadline.
pub struct PtyChannel<C> {
    shell: C,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    /// Deadline applied to every read operation.
    timeout: Duration,
}

impl<C: ShellChannel> PtyChannel<C> {
    pub fn new(shell: C, timeout: Duration) -> Self {
        Self {
            shell,
            buffer: PatternBuffer::new(DEFAULT_SEARCH_DEPTH),
            timeout,
        }
    }

    /// Send a line of input.
    pub async fn send(&mut self, input: &str) -> Result<(), ChannelError> {
        trace!("send: {:?}", input);
        self.write_line(input).await
    }

    /// Send a line of input that must not appear in logs.
    pub async fn send_hidden(&mut self, input: &str) -> Result<(), ChannelError> {
        trace!("send: \"********\"");
        self.write_line(input).await
    }

    async fn write_line(&mut self, input: &str) -> Result<(), ChannelError> {
        let mut line = Vec::with_capacity(input.len() + 1);
        line.extend_from_slice(input.as_bytes());
        line.push(b'\n');
        self.shell.write(&line).await
    }

    /// Read until `pattern` matches the tail of the output.
    pub async fn read_until(&mut self, pattern: &Regex) -> Result<ReadResult, ChannelError> {
        self.read_until_any(&[pattern]).await
    }

    /// Read until any of `patterns` matches the tail of the output.
    ///
    /// Patterns are tried in order; the first one matching wins. The whole
    /// buffered output is consumed and returned.
    pub async fn read_until_any(&mut self, patterns: &[&Regex]) -> Result<ReadResult, ChannelError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(matched) = patterns.iter().position(|p| self.buffer.tail_contains(p)) {
                let prompt = self.buffer.last_line().trim().to_string();
                let data = self.buffer.take();
                let output = String::from_utf8_lossy(&data).into_owned();
                trace!("matched pattern {} with prompt {:?}", matched, prompt);
                return Ok(ReadResult {
                    output,
                    prompt,
                    matched,
                });
            }

            let chunk = tokio::time::timeout_at(deadline, self.shell.read_chunk())
                .await
                .map_err(|_| ChannelError::PatternTimeout(self.timeout))??;

            match chunk {
                Some(data) => self.buffer.extend(&data),
                None => return Err(ChannelError::Closed),
            }
        }
    }

    /// Unwrap the shell so its owner can close it.
    pub fn into_inner(self) -> C {
        self.shell
    }
}

/// Result of a read operation.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Everything read, escape-stripped, including the matched prompt.
    pub output: String,

    /// The last line of the output (the prompt), trimmed.
    pub prompt: String,

    /// Index of the pattern that matched.
    pub matched: usize,
}
