//! Bridge setup
//!
//! Builds the messenger once at startup: the query bridge is bound to its
//! channel here and the resulting handler table is not modified afterwards.

use crate::channel::{Messenger, MethodChannel};
use crate::codec::JsonMethodCodec;
use crate::platform::{HostInfo, SystemHost};
use crate::query::QueryBridge;
use std::sync::Arc;

/// Everything a host process needs to answer bridge requests
pub struct BridgeState {
    pub messenger: Arc<Messenger>,
    pub channel: MethodChannel<JsonMethodCodec>,
}

/// Bridge setup against an arbitrary host - called once on startup
pub fn setup_with_host(host: Arc<dyn HostInfo>) -> BridgeState {
    tracing::info!("Initializing query bridge");

    let bridge = Arc::new(QueryBridge::new(host));
    tracing::debug!("Supported query kinds: {}", bridge.kinds().join(", "));

    let mut messenger = Messenger::new();
    let channel = bridge.register(&mut messenger, JsonMethodCodec::new());

    tracing::info!("Query bridge initialized successfully");

    BridgeState {
        messenger: Arc::new(messenger),
        channel,
    }
}

/// Bridge setup against the running machine
pub fn setup() -> BridgeState {
    setup_with_host(Arc::new(SystemHost::new()))
}
