//! Built-in vendor platforms.
//!
//! Supported vendors form a closed set: adding one means adding a module
//! here and a variant to [`Vendor`].

pub mod cisco;
pub mod juniper;
pub mod mikrotik;

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;

use super::definition::{PlatformDefinition, ShowConfig};
use super::filter::filter_lines;

static CISCO: Lazy<PlatformDefinition> = Lazy::new(cisco::platform);
static JUNIPER: Lazy<PlatformDefinition> = Lazy::new(juniper::platform);
static MIKROTIK: Lazy<PlatformDefinition> = Lazy::new(mikrotik::platform);

/// A supported device vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Cisco,
    Juniper,
    Mikrotik,
}

impl Vendor {
    /// All supported vendors.
    pub const ALL: [Vendor; 3] = [Vendor::Cisco, Vendor::Juniper, Vendor::Mikrotik];

    /// The inventory tag of this vendor.
    pub fn tag(self) -> &'static str {
        match self {
            Vendor::Cisco => "cisco",
            Vendor::Juniper => "juniper",
            Vendor::Mikrotik => "mikrotik",
        }
    }

    /// Protocol knowledge for this vendor.
    pub fn platform(self) -> &'static PlatformDefinition {
        match self {
            Vendor::Cisco => &CISCO,
            Vendor::Juniper => &JUNIPER,
            Vendor::Mikrotik => &MIKROTIK,
        }
    }

    /// The `(rank, command)` pair that dumps the configuration.
    pub fn show_config(self) -> &'static ShowConfig {
        &self.platform().show_config
    }

    /// Strip banners and comment noise from retrieved configuration.
    pub fn filter_config(self, raw: &str) -> String {
        filter_lines(raw, self.platform().line_filter)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error for a vendor tag with no platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported vendor '{0}'")]
pub struct UnknownVendor(pub String);

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let tag = tag.trim();
        Vendor::ALL
            .into_iter()
            .find(|v| v.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| UnknownVendor(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!("cisco".parse::<Vendor>(), Ok(Vendor::Cisco));
        assert_eq!("Juniper".parse::<Vendor>(), Ok(Vendor::Juniper));
        assert_eq!(" mikrotik ".parse::<Vendor>(), Ok(Vendor::Mikrotik));
        assert_eq!(
            "huawei".parse::<Vendor>(),
            Err(UnknownVendor("huawei".to_string()))
        );
    }

    #[test]
    fn test_tag_round_trip() {
        for vendor in Vendor::ALL {
            assert_eq!(vendor.tag().parse::<Vendor>(), Ok(vendor));
        }
    }

    #[test]
    fn test_every_vendor_can_reach_its_dump_rank() {
        for vendor in Vendor::ALL {
            let platform = vendor.platform();
            assert!(
                platform.level_by_rank(vendor.show_config().rank).is_some(),
                "{vendor} has no level for its dump rank"
            );
        }
    }

    #[test]
    fn test_filter_dispatches_per_vendor() {
        let raw = "!\nhostname r1\n# comment\nset x";
        assert_eq!(Vendor::Cisco.filter_config(raw), "hostname r1\n# comment\nset x");
        assert_eq!(Vendor::Mikrotik.filter_config(raw), "!\nhostname r1\n\nset x");
    }

    #[test]
    fn test_filter_empty_input() {
        for vendor in Vendor::ALL {
            assert_eq!(vendor.filter_config(""), "");
        }
    }
}
