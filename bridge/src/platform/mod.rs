//! Host platform queries
//!
//! `HostInfo` is the seam between the query bridge and the operating system.
//! `SystemHost` answers it from the running machine; tests substitute their
//! own implementation.

#[cfg(target_os = "windows")]
pub mod registry;
pub mod sysfs;

pub use sysfs::SysfsProbe;

use crate::error::{BridgeError, Result};
use sysinfo::System;

/// Read-only capabilities of the host
pub trait HostInfo: Send + Sync {
    /// OS family name, e.g. "Ubuntu" or "Windows"
    fn os_name(&self) -> Result<String>;

    /// Human-readable OS version, e.g. "Linux 22.04 Ubuntu"
    fn os_version(&self) -> Result<String>;

    /// Bare OS release, e.g. "22.04" or "11 (22000)"
    fn os_release(&self) -> Result<String>;

    fn kernel_version(&self) -> Result<String>;

    fn host_name(&self) -> Result<String>;

    /// Hardware model of the device
    fn device_model(&self) -> Result<String>;

    /// Logical CPUs available to this process
    fn cpu_count(&self) -> Result<u32>;

    /// Physical memory in bytes
    fn total_memory(&self) -> Result<u64>;

    /// Battery charge in percent for the named power supply
    fn battery_level(&self, supply: &str) -> Result<u8>;
}

/// `HostInfo` backed by the running machine
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    sysfs: SysfsProbe,
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different sysfs root for the Linux probes
    pub fn with_sysfs(sysfs: SysfsProbe) -> Self {
        Self { sysfs }
    }
}

fn unavailable(what: &str) -> BridgeError {
    BridgeError::Host(format!("{} is not available on {}", what, std::env::consts::OS))
}

impl HostInfo for SystemHost {
    fn os_name(&self) -> Result<String> {
        System::name()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| unavailable("OS name"))
    }

    fn os_version(&self) -> Result<String> {
        #[cfg(target_os = "windows")]
        {
            match registry::windows_version() {
                Ok(version) => return Ok(version),
                Err(e) => tracing::warn!("Registry version lookup failed: {}", e),
            }
        }

        // Containers often lack os-release, so fall back to the kernel
        let version = System::long_os_version()
            .or_else(|| {
                System::kernel_version().map(|k| format!("{} {}", std::env::consts::OS, k))
            })
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| std::env::consts::OS.to_string());

        Ok(version)
    }

    fn os_release(&self) -> Result<String> {
        System::os_version()
            .or_else(System::kernel_version)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| unavailable("OS release"))
    }

    fn kernel_version(&self) -> Result<String> {
        System::kernel_version()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| unavailable("Kernel version"))
    }

    fn host_name(&self) -> Result<String> {
        System::host_name()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| unavailable("Host name"))
    }

    fn device_model(&self) -> Result<String> {
        #[cfg(target_os = "linux")]
        {
            self.sysfs.product_name()
        }
        #[cfg(target_os = "windows")]
        {
            registry::system_product_name()
                .map_err(BridgeError::Host)?
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| unavailable("Device model"))
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows")))]
        {
            Err(unavailable("Device model"))
        }
    }

    fn cpu_count(&self) -> Result<u32> {
        let count = std::thread::available_parallelism()
            .map_err(|e| BridgeError::Host(format!("Failed to count CPUs: {}", e)))?;
        Ok(u32::try_from(count.get()).unwrap_or(u32::MAX))
    }

    fn total_memory(&self) -> Result<u64> {
        let mut system = System::new();
        system.refresh_memory();

        match system.total_memory() {
            0 => Err(unavailable("Memory size")),
            bytes => Ok(bytes),
        }
    }

    fn battery_level(&self, supply: &str) -> Result<u8> {
        #[cfg(target_os = "linux")]
        {
            self.sysfs.battery_capacity(supply)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = supply;
            Err(unavailable("Battery level"))
        }
    }
}
