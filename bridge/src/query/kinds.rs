//! Built-in query kinds
//!
//! Kinds are never renamed or removed once published; a caller built
//! against an older table keeps working against a newer one.

use super::{QueryArgs, QueryBridge};
use crate::config::{DEFAULT_BATTERY_SUPPLY, PROTOCOL_VERSION};
use crate::error::{BridgeError, Result};
use crate::value::Value;

pub const OS_VERSION: &str = "osVersion";
pub const PLATFORM_VERSION: &str = "platformVersion";
pub const OS_NAME: &str = "osName";
pub const KERNEL_VERSION: &str = "kernelVersion";
pub const HOST_NAME: &str = "hostName";
pub const DEVICE_MODEL: &str = "deviceModel";
pub const CPU_COUNT: &str = "cpuCount";
pub const TOTAL_MEMORY: &str = "totalMemory";
pub const BATTERY_LEVEL: &str = "batteryLevel";
pub const PROTOCOL_VERSION_KIND: &str = "protocolVersion";

/// Optional string argument; any other type is rejected
fn string_arg<'a>(args: &'a QueryArgs, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(BridgeError::Host(format!(
            "Argument `{}` must be a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Populate `bridge` with every built-in kind
pub fn register_defaults(bridge: &mut QueryBridge) {
    bridge.register_query(OS_VERSION, |host, _| host.os_version().map(Value::from));

    // "<name> <release>", the reply shape of the classic platform-version plugin
    bridge.register_query(PLATFORM_VERSION, |host, _| {
        Ok(Value::from(format!(
            "{} {}",
            host.os_name()?,
            host.os_release()?
        )))
    });

    bridge.register_query(OS_NAME, |host, _| host.os_name().map(Value::from));
    bridge.register_query(KERNEL_VERSION, |host, _| {
        host.kernel_version().map(Value::from)
    });
    bridge.register_query(HOST_NAME, |host, _| host.host_name().map(Value::from));
    bridge.register_query(DEVICE_MODEL, |host, _| host.device_model().map(Value::from));
    bridge.register_query(CPU_COUNT, |host, _| host.cpu_count().map(Value::from));

    bridge.register_query(TOTAL_MEMORY, |host, _| {
        let bytes = host.total_memory()?;
        i64::try_from(bytes)
            .map(Value::Int)
            .map_err(|_| BridgeError::Host(format!("Memory size {} overflows", bytes)))
    });

    bridge.register_query(BATTERY_LEVEL, |host, args| {
        let supply = string_arg(args, "supply")?.unwrap_or(DEFAULT_BATTERY_SUPPLY);
        host.battery_level(supply).map(Value::from)
    });

    bridge.register_query(PROTOCOL_VERSION_KIND, |_, _| {
        Ok(Value::Int(PROTOCOL_VERSION))
    });
}
