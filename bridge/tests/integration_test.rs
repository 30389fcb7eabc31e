//! Integration tests for the platform bridge
//!
//! These tests verify end-to-end functionality including:
//! - Query dispatch through the registered channel
//! - The JSON wire contract
//! - The stdio host loop

use platform_bridge::app::{setup, setup_with_host};
use platform_bridge::channel::Messenger;
use platform_bridge::codec::{JsonMethodCodec, MethodCodec, StandardMethodCodec};
use platform_bridge::config::CHANNEL_NAME;
use platform_bridge::host::serve_lines;
use platform_bridge::platform::HostInfo;
use platform_bridge::{BridgeError, QueryBridge, Result, Value};
use serde_json::json;
use std::sync::Arc;

/// Host with fixed answers and no battery
struct FakeHost;

impl HostInfo for FakeHost {
    fn os_name(&self) -> Result<String> {
        Ok("iOS".to_string())
    }
    fn os_version(&self) -> Result<String> {
        Ok("iOS 17.4".to_string())
    }
    fn os_release(&self) -> Result<String> {
        Ok("17.4".to_string())
    }
    fn kernel_version(&self) -> Result<String> {
        Ok("23.4.0".to_string())
    }
    fn host_name(&self) -> Result<String> {
        Ok("phone".to_string())
    }
    fn device_model(&self) -> Result<String> {
        Ok("iPhone15,2".to_string())
    }
    fn cpu_count(&self) -> Result<u32> {
        Ok(6)
    }
    fn total_memory(&self) -> Result<u64> {
        Ok(6 * 1024 * 1024 * 1024)
    }
    fn battery_level(&self, _supply: &str) -> Result<u8> {
        Err(BridgeError::Host("Permission denied".to_string()))
    }
}

fn send_json(messenger: &Messenger, request: serde_json::Value) -> serde_json::Value {
    let reply = messenger
        .send(CHANNEL_NAME, request.to_string().as_bytes())
        .expect("bridge should always reply");
    serde_json::from_slice(&reply).unwrap()
}

#[test]
fn test_os_version_scenario() {
    let state = setup_with_host(Arc::new(FakeHost));

    let response = send_json(&state.messenger, json!({"kind": "osVersion"}));

    assert_eq!(response, json!({"ok": true, "value": "iOS 17.4"}));
}

#[test]
fn test_unknown_kind_scenario() {
    let state = setup_with_host(Arc::new(FakeHost));

    let response = send_json(&state.messenger, json!({"kind": "doesNotExist"}));

    assert_eq!(response["ok"], json!(false));
    assert_eq!(response["errorCode"], json!("UNIMPLEMENTED"));
    assert_eq!(response["errorMessage"], json!("doesNotExist not supported"));
    assert!(response.get("value").is_none());
}

#[test]
fn test_host_error_scenario() {
    let state = setup_with_host(Arc::new(FakeHost));

    let response = send_json(
        &state.messenger,
        json!({"kind": "batteryLevel", "args": {"supply": "BAT0"}}),
    );

    assert_eq!(
        response,
        json!({"ok": false, "errorCode": "HOST_ERROR", "errorMessage": "Permission denied"})
    );
}

#[test]
fn test_platform_version_matches_plugin_reply() {
    let state = setup_with_host(Arc::new(FakeHost));

    let value = state
        .channel
        .invoke_method(&state.messenger, "platformVersion", Value::Null)
        .unwrap();

    assert_eq!(value, Value::from("iOS 17.4"));
}

#[test]
fn test_numeric_kinds() {
    let state = setup_with_host(Arc::new(FakeHost));

    let cpus = state
        .channel
        .invoke_method(&state.messenger, "cpuCount", Value::Null)
        .unwrap();
    let memory = state
        .channel
        .invoke_method(&state.messenger, "totalMemory", Value::Null)
        .unwrap();

    assert_eq!(cpus, Value::Int(6));
    assert_eq!(memory, Value::Int(6 * 1024 * 1024 * 1024));
}

#[test]
fn test_invoke_surfaces_failures_as_platform_errors() {
    let state = setup_with_host(Arc::new(FakeHost));

    match state
        .channel
        .invoke_method(&state.messenger, "doesNotExist", Value::Null)
    {
        Err(BridgeError::Platform { code, .. }) => assert_eq!(code, "UNIMPLEMENTED"),
        other => panic!("Expected platform error, got {:?}", other),
    }
}

#[test]
fn test_real_host_os_version() {
    let state = setup();

    let value = state
        .channel
        .invoke_method(&state.messenger, "osVersion", Value::Null)
        .unwrap();

    assert!(!value.as_str().unwrap_or_default().trim().is_empty());
}

#[test]
fn test_real_host_is_idempotent() {
    let state = setup();
    let first = send_json(&state.messenger, json!({"kind": "osName"}));
    let second = send_json(&state.messenger, json!({"kind": "osName"}));

    assert_eq!(first, second);
}

#[test]
fn test_reregistration_last_wins() {
    let mut messenger = Messenger::new();

    // First binding speaks JSON, second speaks the binary codec
    let _json = Arc::new(QueryBridge::new(Arc::new(FakeHost)))
        .register(&mut messenger, JsonMethodCodec::new());
    let binary = Arc::new(QueryBridge::new(Arc::new(FakeHost)))
        .register(&mut messenger, StandardMethodCodec::new());

    assert_eq!(messenger.channels(), vec![CHANNEL_NAME]);

    let value = binary
        .invoke_method(&messenger, "deviceModel", Value::Null)
        .unwrap();
    assert_eq!(value, Value::from("iPhone15,2"));

    // A JSON request no longer decodes on this channel
    let reply = messenger
        .send(CHANNEL_NAME, br#"{"kind":"osVersion"}"#)
        .unwrap();
    match StandardMethodCodec::new().decode_envelope("osVersion", &reply) {
        Err(BridgeError::Platform { code, message, .. }) => {
            assert_eq!(code, "error");
            assert_eq!(message.as_deref(), Some("Method call corrupted"));
        }
        other => panic!("Expected platform error, got {:?}", other),
    }
}

#[test]
fn test_concurrent_calls() {
    let state = setup_with_host(Arc::new(FakeHost));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let messenger = Arc::clone(&state.messenger);
            std::thread::spawn(move || send_json(&messenger, json!({"kind": "hostName"})))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), json!({"ok": true, "value": "phone"}));
    }
}

#[tokio::test]
async fn test_stdio_host_end_to_end() {
    let state = setup_with_host(Arc::new(FakeHost));
    let input = concat!(
        "{\"kind\":\"osVersion\"}\n",
        "{\"kind\":\"doesNotExist\"}\n",
        "not json\n",
        "{\"kind\":\"protocolVersion\"}\n",
    );
    let mut output = Vec::new();

    let served = serve_lines(
        Arc::clone(&state.messenger),
        CHANNEL_NAME,
        input.as_bytes(),
        &mut output,
    )
    .await
    .unwrap();

    assert_eq!(served, 4);

    let responses: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses[0], json!({"ok": true, "value": "iOS 17.4"}));
    assert_eq!(responses[1]["errorCode"], json!("UNIMPLEMENTED"));
    assert_eq!(
        responses[2],
        json!({"ok": false, "errorCode": "error", "errorMessage": "Method call corrupted"})
    );
    assert_eq!(responses[3], json!({"ok": true, "value": 1}));
}

#[tokio::test]
async fn test_stdio_host_survives_invalid_utf8() {
    let state = setup_with_host(Arc::new(FakeHost));
    let mut input = Vec::new();
    input.extend_from_slice(b"{\"kind\":\"osVersion\"}\n");
    input.extend_from_slice(b"{\"kind\":\"\xff\xfe\"}\n");
    input.extend_from_slice(b"{\"kind\":\"osVersion\"}\n");
    let mut output = Vec::new();

    let served = serve_lines(
        Arc::clone(&state.messenger),
        CHANNEL_NAME,
        input.as_slice(),
        &mut output,
    )
    .await
    .unwrap();

    assert_eq!(served, 3);

    let responses: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses[0], json!({"ok": true, "value": "iOS 17.4"}));
    assert_eq!(
        responses[1],
        json!({"ok": false, "errorCode": "error", "errorMessage": "Method call corrupted"})
    );
    assert_eq!(responses[2], json!({"ok": true, "value": "iOS 17.4"}));
}
