//! Bridge configuration constants
//!
//! Central location for channel names, wire codes, protocol versioning
//! and the host paths probed by the platform layer.

// ===== Channel =====

/// Name of the channel the query bridge binds to at startup
pub const CHANNEL_NAME: &str = "ext_platform_channel";

/// Version of the query protocol exposed by the bridge.
/// Bumped only when an existing kind changes meaning; new kinds do not bump it.
pub const PROTOCOL_VERSION: i64 = 1;

// ===== Wire Error Codes =====

/// Returned for query kinds missing from the dispatch table
pub const ERROR_UNIMPLEMENTED: &str = "UNIMPLEMENTED";

/// Returned when the underlying host query failed
pub const ERROR_HOST: &str = "HOST_ERROR";

/// Returned by a channel when its handler fails or the call cannot be decoded
pub const ERROR_CHANNEL: &str = "error";

// ===== Codec Limits =====

/// Upper bound on a single encoded message accepted by the stdio host (1 MiB)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

// ===== Linux sysfs =====

/// Root of the sysfs mount used by the Linux probes
pub const SYSFS_ROOT: &str = "/sys";

/// Power supply directory, relative to the sysfs root
pub const POWER_SUPPLY_DIR: &str = "class/power_supply";

/// DMI product name node, relative to the sysfs root
pub const DMI_PRODUCT_NAME: &str = "class/dmi/id/product_name";

/// Power supply queried by `batteryLevel` when no `supply` argument is given
pub const DEFAULT_BATTERY_SUPPLY: &str = "BAT0";

// ===== Windows Registry =====

/// HKLM key holding the Windows product name and display version
pub const REGISTRY_CURRENT_VERSION_KEY: &str = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion";

/// HKLM key holding the BIOS system product name
pub const REGISTRY_BIOS_KEY: &str = "HARDWARE\\DESCRIPTION\\System\\BIOS";
