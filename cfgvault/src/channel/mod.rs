//! Channel layer for interactive shell sessions.
//!
//! This module handles prompt-driven reading on top of any byte-oriented
//! interactive shell, including ANSI stripping and tail pattern search.

mod ansi;
mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{PtyChannel, ReadResult};

use std::future::Future;

use bytes::Bytes;

use crate::error::ChannelError;

/// An open interactive shell on a device.
///
/// Implemented by the SSH transport; tests implement it with scripted or
/// simulated devices. Opening is the transport's job, closing is done by
/// whoever opened it.
pub trait ShellChannel: Send {
    /// Write raw bytes to the shell.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Wait for the next chunk of output. `Ok(None)` means end of stream.
    fn read_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>, ChannelError>> + Send;

    /// Close the shell and release the underlying connection.
    fn close(self) -> impl Future<Output = Result<(), ChannelError>> + Send
    where
        Self: Sized;
}
