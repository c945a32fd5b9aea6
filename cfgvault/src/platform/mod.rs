//! Platform definitions for multi-vendor support.
//!
//! This module defines vendor-specific protocol knowledge: prompt patterns,
//! privilege levels, the configuration dump command and how to filter what
//! it prints.

mod definition;
mod filter;
mod privilege_level;
pub mod vendors;

pub use definition::{PlatformDefinition, ShowConfig};
pub use filter::{LineClass, filter_lines};
pub use privilege_level::PrivilegeLevel;
pub use vendors::{UnknownVendor, Vendor};
