//! Device inventory loading.
//!
//! The inventory is a JSON object keyed by device address:
//!
//! ```json
//! {
//!     "10.0.0.1": {
//!         "vendor": "cisco",
//!         "username": "admin",
//!         "password": "secret",
//!         "connection_type": ["ssh"],
//!         "name": "core-sw",
//!         "privilege": ["enable 15", "enable-secret"]
//!     }
//! }
//! ```
//!
//! Entries that cannot be backed up over SSH are rejected individually and
//! reported; only an unreadable or non-object file is an error. An optional
//! field of the wrong type is ignored with a warning and takes its default.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};
use secrecy::SecretString;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::device::{Credentials, DEFAULT_PORT, DeviceRecord, Privilege};
use crate::error::InventoryError;
use crate::platform::Vendor;

/// A device left out of the run, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub address: String,
    pub reason: String,
}

/// Devices to back up, in file order, plus the rejected ones.
#[derive(Debug, Default)]
pub struct Inventory {
    pub devices: Vec<DeviceRecord>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConnectionKinds {
    One(String),
    Many(Vec<String>),
}

impl ConnectionKinds {
    fn has_ssh(&self) -> bool {
        match self {
            Self::One(kind) => kind.to_ascii_lowercase().contains("ssh"),
            Self::Many(kinds) => kinds.iter().any(|k| k.eq_ignore_ascii_case("ssh")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PrivilegeEntry {
    /// `[command, secret]`, either may be null.
    Pair(Option<String>, Option<String>),
    /// Bare elevation secret.
    Secret(String),
}

#[derive(Debug, Deserialize)]
struct InventoryEntry {
    vendor: String,
    username: String,
    connection_type: ConnectionKinds,
    #[serde(default)]
    port: Option<Value>,
    #[serde(default)]
    password: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    privilege: Option<Value>,
    #[serde(default)]
    key_file: Option<Value>,
    #[serde(default)]
    passphrase: Option<Value>,
}

/// Read an optional field; a value of the wrong type counts as absent.
fn optional<T: DeserializeOwned>(address: &str, field: &str, value: Option<Value>) -> Option<T> {
    let value = value.filter(|v| !v.is_null())?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("{}: ignoring {}: {}", address, field, e);
            None
        }
    }
}

impl Inventory {
    /// Load the inventory file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse an inventory from JSON text.
    pub fn from_json(text: &str) -> Result<Self, InventoryError> {
        let entries: IndexMap<String, serde_json::Value> = serde_json::from_str(text)?;
        let mut inventory = Inventory::default();

        for (address, value) in entries {
            let device = serde_json::from_value::<InventoryEntry>(value)
                .map_err(|e| format!("malformed entry: {e}"))
                .and_then(|entry| build_device(&address, entry));

            match device {
                Ok(device) => {
                    debug!("{}: loaded {} device", address, device.vendor);
                    inventory.devices.push(device);
                }
                Err(reason) => inventory.rejected.push(Rejection { address, reason }),
            }
        }

        Ok(inventory)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn build_device(address: &str, entry: InventoryEntry) -> Result<DeviceRecord, String> {
    let vendor: Vendor = entry.vendor.parse().map_err(|e| format!("{e}"))?;

    if !entry.connection_type.has_ssh() {
        return Err("no ssh connection type".into());
    }

    let port: Option<u16> = optional(address, "port", entry.port);
    let password: Option<String> = optional(address, "password", entry.password);
    let name: Option<String> = optional(address, "name", entry.name);
    let privilege: Option<PrivilegeEntry> = optional(address, "privilege", entry.privilege);
    let key_file: Option<PathBuf> = optional(address, "key_file", entry.key_file);
    let passphrase: Option<String> = optional(address, "passphrase", entry.passphrase);

    let credentials = match (key_file, &password) {
        (Some(path), _) => {
            if !path.is_file() {
                return Err(format!("key file {} not found", path.display()));
            }
            Credentials::PrivateKey {
                path,
                passphrase: passphrase.map(SecretString::from),
            }
        }
        (None, Some(password)) => Credentials::Password(SecretString::from(password.clone())),
        (None, None) => return Err("no password or key file".into()),
    };

    let (command, secret) = match privilege {
        Some(PrivilegeEntry::Pair(command, secret)) => (command, secret),
        Some(PrivilegeEntry::Secret(secret)) => (None, Some(secret)),
        None => (None, None),
    };
    // With key authentication the password only serves elevation.
    let secret = match (secret, &credentials) {
        (Some(secret), _) => Some(secret),
        (None, Credentials::PrivateKey { .. }) => password,
        (None, Credentials::Password(_)) => None,
    };

    let device = DeviceRecord {
        address: address.to_string(),
        name: None,
        vendor,
        port: port.unwrap_or(DEFAULT_PORT),
        username: entry.username,
        credentials,
        privilege: Privilege {
            command,
            secret: secret.map(SecretString::from),
        },
    };

    Ok(match name {
        Some(name) => device.with_name(name),
        None => device,
    })
}
