//! Linux sysfs probes
//!
//! Reads single-value attribute files such as
//! `/sys/class/power_supply/BAT0/capacity`. The root is configurable so the
//! probes can run against a fake tree.

use crate::config::{DMI_PRODUCT_NAME, POWER_SUPPLY_DIR, SYSFS_ROOT};
use crate::error::{BridgeError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Read-only view of a sysfs tree
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    root: PathBuf,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new(SYSFS_ROOT)
    }
}

impl SysfsProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read an attribute file relative to the root, trimmed
    fn read_attribute(&self, relative: &Path) -> Result<String> {
        let path = self.root.join(relative);

        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) => Err(match e.kind() {
                ErrorKind::NotFound => {
                    BridgeError::Host(format!("{} does not exist", path.display()))
                }
                ErrorKind::PermissionDenied => {
                    BridgeError::Host(format!("Permission denied reading {}", path.display()))
                }
                _ => BridgeError::Host(format!("Failed to read {}: {}", path.display(), e)),
            }),
        }
    }

    /// Charge of a power supply in percent (0-100)
    pub fn battery_capacity(&self, supply: &str) -> Result<u8> {
        if supply.is_empty() || supply.contains(['/', '\\']) || supply == ".." {
            return Err(BridgeError::Host(format!(
                "Invalid power supply name: {:?}",
                supply
            )));
        }

        let relative = Path::new(POWER_SUPPLY_DIR).join(supply).join("capacity");
        let raw = self.read_attribute(&relative)?;

        let capacity: u8 = raw.parse().map_err(|_| {
            BridgeError::Host(format!("Unexpected capacity value {:?} for {}", raw, supply))
        })?;

        if capacity > 100 {
            return Err(BridgeError::Host(format!(
                "Capacity {} for {} is out of range",
                capacity, supply
            )));
        }

        Ok(capacity)
    }

    /// DMI product name, e.g. "ThinkPad X1 Carbon Gen 9"
    pub fn product_name(&self) -> Result<String> {
        let name = self.read_attribute(Path::new(DMI_PRODUCT_NAME))?;
        if name.is_empty() {
            return Err(BridgeError::Host("DMI product name is empty".to_string()));
        }
        Ok(name)
    }
}
