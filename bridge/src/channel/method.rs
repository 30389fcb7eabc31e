//! Method channels
//!
//! A method channel layers method-call semantics over a binary channel:
//! incoming messages are decoded into `MethodCall`s, handed to a
//! `MethodCallHandler`, and the handler's response is encoded back into a
//! success or error envelope.

use super::{BinaryMessageHandler, Messenger};
use crate::codec::{MethodCall, MethodCodec};
use crate::config::ERROR_CHANNEL;
use crate::error::{BridgeError, Result};
use crate::value::Value;
use std::sync::Arc;

/// Outcome of handling one method call
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error {
        code: String,
        message: Option<String>,
        details: Value,
    },
    /// Sent back as an empty reply
    NotImplemented,
}

impl MethodResponse {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.into(),
            message: Some(message.into()),
            details: Value::Null,
        }
    }
}

/// Handles method calls arriving on a method channel
///
/// An `Err` is logged and answered with an error envelope carrying the code
/// `error`; it never escapes the channel.
pub trait MethodCallHandler: Send + Sync {
    fn on_method_call(&self, call: &MethodCall) -> Result<MethodResponse>;
}

/// A named channel that speaks method calls through codec `C`
#[derive(Clone)]
pub struct MethodChannel<C> {
    name: String,
    codec: Arc<C>,
}

impl<C: MethodCodec + 'static> MethodChannel<C> {
    pub fn new(name: impl Into<String>, codec: C) -> Self {
        Self {
            name: name.into(),
            codec: Arc::new(codec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `handler` for this channel on `messenger`.
    ///
    /// Overrides any existing registration for this channel name; `None`
    /// deregisters, after which calls get an empty reply.
    pub fn set_method_call_handler(
        &self,
        messenger: &mut Messenger,
        handler: Option<Arc<dyn MethodCallHandler>>,
    ) {
        let incoming = handler.map(|handler| {
            Arc::new(IncomingMethodCallHandler {
                channel: self.name.clone(),
                codec: Arc::clone(&self.codec),
                handler,
            }) as Arc<dyn BinaryMessageHandler>
        });
        messenger.set_message_handler(&self.name, incoming);
    }

    /// Invoke `method` on this channel and decode the result.
    ///
    /// An error envelope becomes `BridgeError::Platform`, an empty reply
    /// becomes `BridgeError::NotImplemented`.
    pub fn invoke_method(
        &self,
        messenger: &Messenger,
        method: &str,
        arguments: Value,
    ) -> Result<Value> {
        let call = MethodCall::new(method, arguments);
        let message = self.codec.encode_method_call(&call)?;

        match messenger.send(&self.name, &message) {
            Some(reply) => self.codec.decode_envelope(method, &reply),
            None => Err(BridgeError::NotImplemented(method.to_string())),
        }
    }
}

struct IncomingMethodCallHandler<C> {
    channel: String,
    codec: Arc<C>,
    handler: Arc<dyn MethodCallHandler>,
}

impl<C: MethodCodec> IncomingMethodCallHandler<C> {
    fn encode_response(&self, method: &str, response: MethodResponse) -> Result<Option<Vec<u8>>> {
        let envelope = match response {
            MethodResponse::Success(value) => self.codec.encode_success_envelope(method, &value)?,
            MethodResponse::Error {
                code,
                message,
                details,
            } => self
                .codec
                .encode_error_envelope(method, &code, message.as_deref(), &details)?,
            MethodResponse::NotImplemented => return Ok(None),
        };
        Ok(Some(envelope))
    }

    fn channel_error(&self, method: &str, message: &str) -> Option<Vec<u8>> {
        match self
            .codec
            .encode_error_envelope(method, ERROR_CHANNEL, Some(message), &Value::Null)
        {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::error!(
                    "Failed to encode error reply on channel {}: {}",
                    self.channel,
                    e
                );
                None
            }
        }
    }
}

impl<C: MethodCodec> BinaryMessageHandler for IncomingMethodCallHandler<C> {
    fn on_message(&self, message: &[u8]) -> Option<Vec<u8>> {
        let call = match self.codec.decode_method_call(message) {
            Ok(call) => call,
            Err(e) => {
                tracing::error!("Failed to decode method call on {}: {}", self.channel, e);
                return self.channel_error("", "Method call corrupted");
            }
        };

        tracing::debug!("Method call {} on channel {}", call.method, self.channel);

        let outcome = self
            .handler
            .on_method_call(&call)
            .and_then(|response| self.encode_response(&call.method, response));

        match outcome {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    "Failed to handle method call {} on {}: {}",
                    call.method,
                    self.channel,
                    e
                );
                self.channel_error(&call.method, &e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{JsonMethodCodec, StandardMethodCodec};

    /// Echoes arguments back, fails on "boom", ignores "skip"
    struct TestHandler;

    impl MethodCallHandler for TestHandler {
        fn on_method_call(&self, call: &MethodCall) -> Result<MethodResponse> {
            match call.method.as_str() {
                "echo" => Ok(MethodResponse::Success(call.arguments.clone())),
                "reject" => Ok(MethodResponse::error("BAD", "rejected")),
                "boom" => Err(BridgeError::Generic("exploded".to_string())),
                _ => Ok(MethodResponse::NotImplemented),
            }
        }
    }

    fn setup<C: MethodCodec + 'static>(codec: C) -> (Messenger, MethodChannel<C>) {
        let mut messenger = Messenger::new();
        let channel = MethodChannel::new("test", codec);
        channel.set_method_call_handler(&mut messenger, Some(Arc::new(TestHandler)));
        (messenger, channel)
    }

    #[test]
    fn test_invoke_success() {
        let (messenger, channel) = setup(StandardMethodCodec::new());
        let result = channel
            .invoke_method(&messenger, "echo", Value::from("hello"))
            .unwrap();

        assert_eq!(result, Value::from("hello"));
    }

    #[test]
    fn test_invoke_error_response() {
        let (messenger, channel) = setup(JsonMethodCodec::new());

        match channel.invoke_method(&messenger, "reject", Value::Null) {
            Err(BridgeError::Platform { code, message, .. }) => {
                assert_eq!(code, "BAD");
                assert_eq!(message.as_deref(), Some("rejected"));
            }
            other => panic!("Expected platform error, got {:?}", other),
        }
    }

    #[test]
    fn test_handler_failure_becomes_error_envelope() {
        let (messenger, channel) = setup(StandardMethodCodec::new());

        match channel.invoke_method(&messenger, "boom", Value::Null) {
            Err(BridgeError::Platform { code, message, .. }) => {
                assert_eq!(code, ERROR_CHANNEL);
                assert!(message.unwrap_or_default().contains("exploded"));
            }
            other => panic!("Expected platform error, got {:?}", other),
        }
    }

    #[test]
    fn test_not_implemented_is_empty_reply() {
        let (messenger, channel) = setup(StandardMethodCodec::new());

        assert!(matches!(
            channel.invoke_method(&messenger, "skip", Value::Null),
            Err(BridgeError::NotImplemented(m)) if m == "skip"
        ));
    }

    #[test]
    fn test_corrupted_call_gets_error_reply() {
        let (messenger, _channel) = setup(JsonMethodCodec::new());

        let reply = messenger.send("test", b"{not json").unwrap();
        match JsonMethodCodec.decode_envelope("", &reply) {
            Err(BridgeError::Platform { code, message, .. }) => {
                assert_eq!(code, ERROR_CHANNEL);
                assert_eq!(message.as_deref(), Some("Method call corrupted"));
            }
            other => panic!("Expected platform error, got {:?}", other),
        }
    }

    #[test]
    fn test_unregistered_channel() {
        let messenger = Messenger::new();
        let channel = MethodChannel::new("absent", JsonMethodCodec::new());

        assert!(matches!(
            channel.invoke_method(&messenger, "echo", Value::Null),
            Err(BridgeError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_deregister_handler() {
        let (mut messenger, channel) = setup(StandardMethodCodec::new());
        channel.set_method_call_handler(&mut messenger, None);

        assert!(!messenger.has_handler(channel.name()));
    }
}
