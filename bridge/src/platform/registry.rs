//! Windows Registry reads
//!
//! Safe wrappers around the Registry APIs used to identify the host:
//! the Windows display version and the BIOS product name.

use std::ffi::OsStr;
use std::iter;
use std::os::windows::ffi::OsStrExt;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_PATH_NOT_FOUND, ERROR_SUCCESS};
use windows::Win32::System::Registry::{
    RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
    REG_EXPAND_SZ, REG_SZ, REG_VALUE_TYPE,
};

use crate::config::{REGISTRY_BIOS_KEY, REGISTRY_CURRENT_VERSION_KEY};

/// Convert a Rust string to a null-terminated UTF-16 wide string for Win32 APIs
fn to_wide(input: &str) -> Vec<u16> {
    OsStr::new(input)
        .encode_wide()
        .chain(iter::once(0))
        .collect()
}

/// Read-only access to HKEY_LOCAL_MACHINE
pub struct WindowsRegistry;

impl WindowsRegistry {
    /// Read a REG_SZ value under HKEY_LOCAL_MACHINE
    ///
    /// # Returns
    /// * `Ok(Some(value))` if the value exists and is a string
    /// * `Ok(None)` if the key or value doesn't exist
    /// * `Err(String)` on other errors, including a non-string value
    pub fn read_string(key_path: &str, value_name: &str) -> Result<Option<String>, String> {
        let key_path_wide = to_wide(key_path);
        let value_name_wide = to_wide(value_name);
        let mut key_handle: HKEY = HKEY::default();

        // SAFETY:
        // - key_path_wide is a valid null-terminated UTF-16 buffer that outlives this call
        // - key_handle is a valid pointer to receive the opened key
        // - We use KEY_READ for read-only access
        let open_result = unsafe {
            RegOpenKeyExW(
                HKEY_LOCAL_MACHINE,
                PCWSTR::from_raw(key_path_wide.as_ptr()),
                0,
                KEY_READ,
                &mut key_handle,
            )
        };

        if open_result != ERROR_SUCCESS {
            if open_result == ERROR_FILE_NOT_FOUND || open_result == ERROR_PATH_NOT_FOUND {
                return Ok(None);
            }
            return Err(format!(
                "Failed to open registry key: error code {}",
                open_result.0
            ));
        }

        let result = Self::query_string(key_handle, &value_name_wide);

        // SAFETY: key_handle was opened successfully and must be closed
        let _ = unsafe { RegCloseKey(key_handle) };

        result
    }

    fn query_string(key_handle: HKEY, value_name_wide: &[u16]) -> Result<Option<String>, String> {
        let mut value_type = REG_VALUE_TYPE::default();
        let mut size: u32 = 0;

        // First call sizes the buffer
        // SAFETY:
        // - key_handle is valid from a successful RegOpenKeyExW
        // - value_name_wide is a valid null-terminated UTF-16 buffer
        // - value_type and size are valid out pointers
        let size_result = unsafe {
            RegQueryValueExW(
                key_handle,
                PCWSTR::from_raw(value_name_wide.as_ptr()),
                None,
                Some(&mut value_type),
                None,
                Some(&mut size),
            )
        };

        if size_result == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if size_result != ERROR_SUCCESS {
            return Err(format!(
                "Failed to query registry value: error code {}",
                size_result.0
            ));
        }
        if value_type != REG_SZ && value_type != REG_EXPAND_SZ {
            return Err(format!(
                "Registry value is not a string (type {})",
                value_type.0
            ));
        }

        // UTF-16 = 2 bytes per character; round up for odd sizes
        let mut buffer = vec![0u16; (size as usize).div_ceil(2)];

        // SAFETY:
        // - buffer holds at least `size` bytes and outlives the call
        // - size is updated with the number of bytes written
        let read_result = unsafe {
            RegQueryValueExW(
                key_handle,
                PCWSTR::from_raw(value_name_wide.as_ptr()),
                None,
                None,
                Some(buffer.as_mut_ptr() as *mut u8),
                Some(&mut size),
            )
        };

        if read_result != ERROR_SUCCESS {
            return Err(format!(
                "Failed to read registry value: error code {}",
                read_result.0
            ));
        }

        buffer.truncate((size as usize) / 2);
        while buffer.last() == Some(&0) {
            buffer.pop();
        }

        Ok(Some(String::from_utf16_lossy(&buffer)))
    }
}

/// Windows version as shown in Settings, e.g. "Windows 10 Pro 22H2 (build 19045)"
pub fn windows_version() -> Result<String, String> {
    let read = |name: &str| WindowsRegistry::read_string(REGISTRY_CURRENT_VERSION_KEY, name);

    let product = read("ProductName")?.ok_or("ProductName missing from registry")?;
    let display = read("DisplayVersion")?;
    let build = read("CurrentBuild")?;

    Ok(format_version(&product, display.as_deref(), build.as_deref()))
}

/// Join product, display version and build in the order Settings shows them
fn format_version(product: &str, display: Option<&str>, build: Option<&str>) -> String {
    let mut version = product.to_string();
    if let Some(display) = display {
        version.push(' ');
        version.push_str(display);
    }
    if let Some(build) = build {
        version.push_str(&format!(" (build {})", build));
    }
    version
}

/// BIOS system product name, e.g. "Surface Laptop 5"
pub fn system_product_name() -> Result<Option<String>, String> {
    WindowsRegistry::read_string(REGISTRY_BIOS_KEY, "SystemProductName")
}
