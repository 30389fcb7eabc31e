//! Query bridge
//!
//! Maps an incoming `(kind, args)` pair to a `QueryResult` by looking the
//! kind up in a table of host queries. The bridge is stateless: every call
//! reads the host afresh and nothing is shared between calls except the
//! immutable table itself.

pub mod kinds;

use crate::channel::{MethodCallHandler, MethodChannel, MethodResponse, Messenger};
use crate::codec::{MethodCall, MethodCodec};
use crate::config::{CHANNEL_NAME, ERROR_HOST, ERROR_UNIMPLEMENTED};
use crate::error::{BridgeError, Result};
use crate::platform::HostInfo;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Arguments of a query, keyed by name
pub type QueryArgs = BTreeMap<String, Value>;

/// One host query: reads the host and produces a primitive value
pub type QueryFn = Box<dyn Fn(&dyn HostInfo, &QueryArgs) -> Result<Value> + Send + Sync>;

/// A request for one host capability
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    pub kind: String,
    pub args: QueryArgs,
}

impl QueryRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            args: QueryArgs::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Build a request from a decoded method call.
    ///
    /// Arguments must be null or a map of string keys to primitive values.
    pub fn from_method_call(call: &MethodCall) -> std::result::Result<Self, String> {
        let args = match &call.arguments {
            Value::Null => QueryArgs::new(),
            Value::Map(entries) => {
                let mut args = QueryArgs::new();
                for (key, value) in entries {
                    let key = key.as_str().ok_or_else(|| {
                        format!("Argument names must be strings, got {}", key.type_name())
                    })?;
                    if !value.is_primitive() {
                        return Err(format!(
                            "Argument `{}` must be a primitive, got {}",
                            key,
                            value.type_name()
                        ));
                    }
                    args.insert(key.to_string(), value.clone());
                }
                args
            }
            other => {
                return Err(format!(
                    "Arguments must be a map, got {}",
                    other.type_name()
                ))
            }
        };

        Ok(Self {
            kind: call.method.clone(),
            args,
        })
    }
}

/// Failure codes a query can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The query kind is not in the table
    Unimplemented,
    /// The host query itself failed
    HostError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unimplemented => ERROR_UNIMPLEMENTED,
            ErrorCode::HostError => ERROR_HOST,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Success(Value),
    Failure { code: ErrorCode, message: String },
}

impl QueryResult {
    pub fn unimplemented(kind: &str) -> Self {
        QueryResult::Failure {
            code: ErrorCode::Unimplemented,
            message: format!("{} not supported", kind),
        }
    }

    pub fn host_error(message: impl Into<String>) -> Self {
        QueryResult::Failure {
            code: ErrorCode::HostError,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            QueryResult::Success(value) => Some(value),
            QueryResult::Failure { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            QueryResult::Success(_) => None,
            QueryResult::Failure { code, .. } => Some(*code),
        }
    }
}

impl From<QueryResult> for MethodResponse {
    fn from(result: QueryResult) -> Self {
        match result {
            QueryResult::Success(value) => MethodResponse::Success(value),
            QueryResult::Failure { code, message } => MethodResponse::error(code.as_str(), message),
        }
    }
}

/// Message for a failed host query, without the error-kind prefix
fn host_message(error: BridgeError) -> String {
    match error {
        BridgeError::Host(message) => message,
        other => other.to_string(),
    }
}

/// Dispatches query kinds to host queries
pub struct QueryBridge {
    host: Arc<dyn HostInfo>,
    queries: HashMap<String, QueryFn>,
}

impl QueryBridge {
    /// Bridge with the built-in query table
    pub fn new(host: Arc<dyn HostInfo>) -> Self {
        let mut bridge = Self::empty(host);
        kinds::register_defaults(&mut bridge);
        bridge
    }

    /// Bridge with no queries registered
    pub fn empty(host: Arc<dyn HostInfo>) -> Self {
        Self {
            host,
            queries: HashMap::new(),
        }
    }

    /// Add a query kind, replacing any existing query of the same kind.
    /// Returns true if a query was replaced.
    pub fn register_query<F>(&mut self, kind: impl Into<String>, query: F) -> bool
    where
        F: Fn(&dyn HostInfo, &QueryArgs) -> Result<Value> + Send + Sync + 'static,
    {
        self.queries.insert(kind.into(), Box::new(query)).is_some()
    }

    /// Registered query kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.queries.contains_key(kind)
    }

    /// Run one query
    pub fn handle(&self, request: &QueryRequest) -> QueryResult {
        let Some(query) = self.queries.get(&request.kind) else {
            tracing::debug!("Unsupported query kind {:?}", request.kind);
            return QueryResult::unimplemented(&request.kind);
        };

        match query(self.host.as_ref(), &request.args) {
            Ok(value) if value.is_primitive() && !value.is_empty_value() => {
                QueryResult::Success(value)
            }
            Ok(value) => {
                tracing::warn!(
                    "Query {} produced an unusable {} value",
                    request.kind,
                    value.type_name()
                );
                QueryResult::host_error(format!("{} returned no value", request.kind))
            }
            Err(e) => {
                tracing::warn!("Query {} failed: {}", request.kind, e);
                QueryResult::host_error(host_message(e))
            }
        }
    }

    /// Bind this bridge as the handler of the bridge channel on `messenger`.
    /// A later registration on the same channel replaces this one.
    pub fn register<C: MethodCodec + 'static>(
        self: Arc<Self>,
        messenger: &mut Messenger,
        codec: C,
    ) -> MethodChannel<C> {
        let channel = MethodChannel::new(CHANNEL_NAME, codec);
        channel.set_method_call_handler(messenger, Some(self));
        tracing::info!("Query bridge registered on channel {}", CHANNEL_NAME);
        channel
    }
}

impl MethodCallHandler for QueryBridge {
    fn on_method_call(&self, call: &MethodCall) -> Result<MethodResponse> {
        let result = match QueryRequest::from_method_call(call) {
            Ok(request) => self.handle(&request),
            Err(message) => QueryResult::host_error(message),
        };
        Ok(result.into())
    }
}
