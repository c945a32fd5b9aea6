//! Session protocol driver.
//!
//! Turns an open interactive shell plus a device record into a
//! [`SessionOutcome`]: detect the current privilege from the prompt, walk
//! to the rank the configuration dump needs, run the dump.

mod outcome;
mod privilege;
mod session;

pub use outcome::{FailureReason, QueueItem, SessionOutcome};
pub use privilege::{PrivilegeManager, TransitionInfo};
pub use session::{MAX_ESCALATION_ATTEMPTS, SessionDriver, normalize_output};
