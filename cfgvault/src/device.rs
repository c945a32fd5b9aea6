//! Device records: one reachable device, its credentials and vendor.

use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::platform::Vendor;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// How the device authenticates the SSH login.
pub enum Credentials {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(********)"),
            Self::PrivateKey { path, .. } => {
                f.debug_struct("PrivateKey").field("path", path).finish()
            }
        }
    }
}

/// Privilege elevation settings.
#[derive(Default)]
pub struct Privilege {
    /// Overrides the vendor's elevate command (e.g. `enable 15`).
    pub command: Option<String>,

    /// Elevation secret; falls back to the login password.
    pub secret: Option<SecretString>,
}

impl fmt::Debug for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Privilege")
            .field("command", &self.command)
            .field("secret", &self.secret.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Immutable description of one device.
#[derive(Debug)]
pub struct DeviceRecord {
    /// Network address (IP or hostname); also the inventory key.
    pub address: String,

    /// Friendly name, if any.
    pub name: Option<String>,

    pub vendor: Vendor,

    pub port: u16,

    pub username: String,

    pub credentials: Credentials,

    pub privilege: Privilege,
}

impl DeviceRecord {
    /// Create a password-authenticated device on the default port.
    pub fn new(
        address: impl Into<String>,
        vendor: Vendor,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            name: None,
            vendor,
            port: DEFAULT_PORT,
            username: username.into(),
            credentials: Credentials::Password(SecretString::from(password.into())),
            privilege: Privilege::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// Secret to answer the elevation password prompt with.
    pub fn elevation_secret(&self) -> Option<&str> {
        match (&self.privilege.secret, &self.credentials) {
            (Some(secret), _) => Some(secret.expose_secret()),
            (None, Credentials::Password(password)) => Some(password.expose_secret()),
            (None, Credentials::PrivateKey { .. }) => None,
        }
    }

    /// Per-device directory name: `<name>-<address>`, or `<address>` alone.
    pub fn artifact_dir_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{}-{}", name, self.address),
            None => self.address.clone(),
        }
    }

    /// Directory holding this device's backup under `root`.
    pub fn artifact_dir(&self, root: &Path) -> PathBuf {
        root.join(self.artifact_dir_name())
    }

    /// Backup file path under `root`.
    pub fn artifact_file(&self, root: &Path) -> PathBuf {
        self.artifact_dir(root)
            .join(format!("{}_conf.txt", self.address))
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.address, name),
            None => f.write_str(&self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_without_name() {
        let device = DeviceRecord::new("10.0.0.1", Vendor::Cisco, "admin", "p1");
        let root = Path::new("/backups");
        assert_eq!(device.artifact_dir(root), Path::new("/backups/10.0.0.1"));
        assert_eq!(
            device.artifact_file(root),
            Path::new("/backups/10.0.0.1/10.0.0.1_conf.txt")
        );
    }

    #[test]
    fn test_artifact_paths_with_name() {
        let device =
            DeviceRecord::new("10.0.0.1", Vendor::Cisco, "admin", "p1").with_name("core-sw");
        assert_eq!(device.artifact_dir_name(), "core-sw-10.0.0.1");
        assert_eq!(
            device.artifact_file(Path::new("b")),
            Path::new("b/core-sw-10.0.0.1/10.0.0.1_conf.txt")
        );
    }

    #[test]
    fn test_empty_name_is_absent() {
        let device = DeviceRecord::new("10.0.0.1", Vendor::Cisco, "admin", "p1").with_name("");
        assert!(device.name.is_none());
    }

    #[test]
    fn test_elevation_secret_defaults_to_password() {
        let mut device = DeviceRecord::new("10.0.0.1", Vendor::Cisco, "admin", "p1");
        assert_eq!(device.elevation_secret(), Some("p1"));

        device.privilege = Privilege {
            command: None,
            secret: Some(SecretString::from("en-secret")),
        };
        assert_eq!(device.elevation_secret(), Some("en-secret"));
    }

    #[test]
    fn test_key_auth_has_no_default_secret() {
        let mut device = DeviceRecord::new("10.0.0.1", Vendor::Juniper, "admin", "unused");
        device.credentials = Credentials::PrivateKey {
            path: PathBuf::from("/keys/id_ed25519"),
            passphrase: None,
        };
        assert_eq!(device.elevation_secret(), None);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let device = DeviceRecord::new("10.0.0.1", Vendor::Cisco, "admin", "hunter2");
        assert!(!format!("{:?}", device).contains("hunter2"));
    }
}
