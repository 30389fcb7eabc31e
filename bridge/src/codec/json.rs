//! JSON method codec
//!
//! Wire contract:
//! - request: `{"kind": string, "args"?: {string: primitive}}`
//! - response: `{"ok": bool, "value"?: any, "errorCode"?: string, "errorMessage"?: string, "errorDetails"?: any}`

use super::{MethodCall, MethodCodec};
use crate::error::{BridgeError, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Request object as it appears on the wire
#[derive(Debug, Serialize, Deserialize)]
pub struct WireRequest {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

/// Response object as it appears on the wire
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl WireResponse {
    pub fn failure(code: impl Into<String>, message: Option<String>) -> Self {
        Self {
            ok: false,
            error_code: Some(code.into()),
            error_message: message,
            ..Self::default()
        }
    }
}

/// Method codec speaking the JSON wire contract
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMethodCodec;

impl JsonMethodCodec {
    pub fn new() -> Self {
        Self
    }
}

fn non_null(value: &Value) -> Result<Option<serde_json::Value>> {
    if value.is_null() {
        Ok(None)
    } else {
        value.to_json().map(Some)
    }
}

impl MethodCodec for JsonMethodCodec {
    fn encode_method_call(&self, call: &MethodCall) -> Result<Vec<u8>> {
        let request = WireRequest {
            kind: call.method.clone(),
            args: non_null(&call.arguments)?,
        };
        Ok(serde_json::to_vec(&request)?)
    }

    fn decode_method_call(&self, message: &[u8]) -> Result<MethodCall> {
        let request: WireRequest = serde_json::from_slice(message)?;
        let arguments = match request.args {
            None | Some(serde_json::Value::Null) => Value::Null,
            Some(args @ serde_json::Value::Object(_)) => Value::from_json(&args),
            Some(other) => {
                return Err(BridgeError::Codec(format!(
                    "Method call corrupted: args must be an object, got {}",
                    other
                )))
            }
        };
        Ok(MethodCall {
            method: request.kind,
            arguments,
        })
    }

    fn encode_success_envelope(&self, _method: &str, result: &Value) -> Result<Vec<u8>> {
        let response = WireResponse {
            ok: true,
            value: non_null(result)?,
            ..WireResponse::default()
        };
        Ok(serde_json::to_vec(&response)?)
    }

    fn encode_error_envelope(
        &self,
        _method: &str,
        code: &str,
        message: Option<&str>,
        details: &Value,
    ) -> Result<Vec<u8>> {
        let response = WireResponse {
            error_details: non_null(details)?,
            ..WireResponse::failure(code, message.map(str::to_string))
        };
        Ok(serde_json::to_vec(&response)?)
    }

    fn decode_envelope(&self, _method: &str, envelope: &[u8]) -> Result<Value> {
        let response: WireResponse = serde_json::from_slice(envelope)?;

        if response.ok {
            return Ok(response
                .value
                .as_ref()
                .map(Value::from_json)
                .unwrap_or_default());
        }

        match response.error_code {
            Some(code) => Err(BridgeError::Platform {
                code,
                message: response.error_message,
                details: response
                    .error_details
                    .as_ref()
                    .map(Value::from_json)
                    .unwrap_or_default(),
            }),
            None => Err(BridgeError::Codec(
                "Envelope corrupted: failure without errorCode".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_request_without_args() {
        let call = JsonMethodCodec
            .decode_method_call(br#"{"kind":"osVersion"}"#)
            .unwrap();

        assert_eq!(call.method, "osVersion");
        assert!(call.arguments.is_null());
    }

    #[test]
    fn test_decode_request_with_args() {
        let call = JsonMethodCodec
            .decode_method_call(br#"{"kind":"batteryLevel","args":{"supply":"BAT1"}}"#)
            .unwrap();

        assert_eq!(call.arguments.get("supply"), Some(&Value::from("BAT1")));
    }

    #[test]
    fn test_decode_request_rejects_bad_shapes() {
        assert!(JsonMethodCodec.decode_method_call(b"not json").is_err());
        assert!(JsonMethodCodec.decode_method_call(br#"{"args":{}}"#).is_err());
        assert!(JsonMethodCodec
            .decode_method_call(br#"{"kind":"osVersion","args":[1]}"#)
            .is_err());
    }

    #[test]
    fn test_success_envelope_shape() {
        let bytes = JsonMethodCodec
            .encode_success_envelope("osVersion", &Value::from("Linux 6.1"))
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json, json!({"ok": true, "value": "Linux 6.1"}));
    }

    #[test]
    fn test_error_envelope_shape() {
        let bytes = JsonMethodCodec
            .encode_error_envelope(
                "doesNotExist",
                "UNIMPLEMENTED",
                Some("doesNotExist not supported"),
                &Value::Null,
            )
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            json,
            json!({
                "ok": false,
                "errorCode": "UNIMPLEMENTED",
                "errorMessage": "doesNotExist not supported"
            })
        );
    }

    #[test]
    fn test_decode_error_envelope() {
        let result = JsonMethodCodec.decode_envelope(
            "batteryLevel",
            br#"{"ok":false,"errorCode":"HOST_ERROR","errorMessage":"no battery"}"#,
        );

        match result {
            Err(BridgeError::Platform { code, message, .. }) => {
                assert_eq!(code, "HOST_ERROR");
                assert_eq!(message.as_deref(), Some("no battery"));
            }
            other => panic!("Expected platform error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_failure_without_code_is_corrupted() {
        let result = JsonMethodCodec.decode_envelope("m", br#"{"ok":false}"#);
        assert!(matches!(result, Err(BridgeError::Codec(_))));
    }

    #[test]
    fn test_request_round_trip() {
        let call = MethodCall::new(
            "cpuCount",
            Value::Map(vec![(Value::from("verbose"), Value::Bool(true))]),
        );
        let bytes = JsonMethodCodec.encode_method_call(&call).unwrap();

        assert_eq!(JsonMethodCodec.decode_method_call(&bytes).unwrap(), call);
    }
}
