//! Session outcomes and the queue items that carry them.

use std::fmt;
use std::sync::Arc;

use crate::device::DeviceRecord;
use crate::error::{ChannelError, TransportError};

/// Why one device produced no configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// TCP connect, handshake or login did not finish in time.
    ConnectionTimeout,

    /// Unreachable, refused, host key mismatch or protocol failure.
    Connection(String),

    /// The device rejected the login credentials.
    AuthenticationFailed,

    /// The required rank was not reached within the attempt bound.
    PrivilegeNotAttainable,

    /// The shell presented a prompt no privilege level recognises.
    UnknownPrompt(String),

    /// The dump command failed or the channel broke while running it.
    Command(String),

    /// The configuration could not be written or committed.
    Persistence(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionTimeout => f.write_str("connection timeout"),
            Self::Connection(msg) => write!(f, "connection failed: {msg}"),
            Self::AuthenticationFailed => f.write_str("authentication failed"),
            Self::PrivilegeNotAttainable => f.write_str("privilege not attainable"),
            Self::UnknownPrompt(prompt) => write!(f, "unrecognised prompt {prompt:?}"),
            Self::Command(msg) => write!(f, "command failed: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence failed: {msg}"),
        }
    }
}

impl From<TransportError> for FailureReason {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => Self::ConnectionTimeout,
            TransportError::AuthenticationFailed { .. } => Self::AuthenticationFailed,
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<ChannelError> for FailureReason {
    fn from(err: ChannelError) -> Self {
        Self::Command(err.to_string())
    }
}

/// The result of one device session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub device: Arc<DeviceRecord>,

    /// Raw configuration text, or why there is none.
    pub result: Result<String, FailureReason>,
}

impl SessionOutcome {
    pub fn success(device: Arc<DeviceRecord>, output: String) -> Self {
        Self {
            device,
            result: Ok(output),
        }
    }

    pub fn failure(device: Arc<DeviceRecord>, reason: FailureReason) -> Self {
        Self {
            device,
            result: Err(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Item on the outcome queue.
#[derive(Debug)]
pub enum QueueItem {
    Outcome(SessionOutcome),

    /// No more outcomes will follow.
    EndOfStream,
}
