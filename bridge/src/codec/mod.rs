//! Method codecs
//!
//! A method codec turns method calls and their replies ("envelopes") into
//! bytes and back. Two codecs are provided:
//! - `standard`: the binary layout used by Flutter's `StandardMethodCodec`
//! - `json`: the JSON request/response contract spoken by the stdio host

pub mod json;
pub mod standard;

pub use json::JsonMethodCodec;
pub use standard::{
    ArgumentsCodec, ReadParcel, StandardMessageCodec, StandardMethodCodec, WriteParcel,
};

use crate::error::Result;
use crate::value::Value;

/// A method invocation: a method name plus its (possibly null) arguments
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Encodes method calls and decodes their results
///
/// Error envelopes decode to `BridgeError::Platform`, so callers see a
/// remote failure as an ordinary `Err`.
pub trait MethodCodec: Send + Sync {
    fn encode_method_call(&self, call: &MethodCall) -> Result<Vec<u8>>;

    fn decode_method_call(&self, message: &[u8]) -> Result<MethodCall>;

    fn encode_success_envelope(&self, method: &str, result: &Value) -> Result<Vec<u8>>;

    fn encode_error_envelope(
        &self,
        method: &str,
        code: &str,
        message: Option<&str>,
        details: &Value,
    ) -> Result<Vec<u8>>;

    fn decode_envelope(&self, method: &str, envelope: &[u8]) -> Result<Value>;
}
