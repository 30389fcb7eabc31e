//! Named channels between the native layer and its caller
//!
//! The `Messenger` routes binary messages to handlers by channel name. It is
//! populated during setup and then shared behind an `Arc`, so routing needs
//! no locks and concurrent sends are safe.

pub mod method;

pub use method::{MethodCallHandler, MethodChannel, MethodResponse};

use std::collections::HashMap;
use std::sync::Arc;

/// Handles raw messages arriving on one channel
///
/// Returning `None` is the empty reply: the caller treats the channel as
/// having no implementation for the message.
pub trait BinaryMessageHandler: Send + Sync {
    fn on_message(&self, message: &[u8]) -> Option<Vec<u8>>;
}

/// Handler table keyed by channel name
#[derive(Default, Clone)]
pub struct Messenger {
    handlers: HashMap<String, Arc<dyn BinaryMessageHandler>>,
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `channel`, replacing any previous registration.
    /// Passing `None` removes the registration.
    pub fn set_message_handler(
        &mut self,
        channel: &str,
        handler: Option<Arc<dyn BinaryMessageHandler>>,
    ) {
        match handler {
            Some(handler) => {
                if self.handlers.insert(channel.to_string(), handler).is_some() {
                    tracing::debug!("Replaced handler on channel {}", channel);
                } else {
                    tracing::debug!("Registered handler on channel {}", channel);
                }
            }
            None => {
                if self.handlers.remove(channel).is_some() {
                    tracing::debug!("Removed handler from channel {}", channel);
                }
            }
        }
    }

    /// Deliver `message` to the handler on `channel` and return its reply
    pub fn send(&self, channel: &str, message: &[u8]) -> Option<Vec<u8>> {
        match self.handlers.get(channel) {
            Some(handler) => handler.on_message(message),
            None => {
                tracing::warn!("No handler registered on channel {}", channel);
                None
            }
        }
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.handlers.contains_key(channel)
    }

    /// Names of all channels with a registered handler, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
