//! platform-bridge library
//!
//! Exposes host capabilities (OS version, device model, battery level, ...)
//! to a calling layer through a single named method channel.

pub mod app;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod host;
pub mod platform;
pub mod query;
pub mod value;

pub use error::{BridgeError, Result};
pub use query::{ErrorCode, QueryBridge, QueryRequest, QueryResult};
pub use value::Value;
