//! Inbound method-call surface
//!
//! The host runtime delivers requests as a method name plus a JSON argument
//! list. This module decodes those four calls, runs them against the
//! coordinator and encodes a single success value or error per call. How
//! the calls reach the process is up to the embedder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::coordinator::GeofenceCoordinator;
use crate::models::GeofenceSpec;

pub const INITIALIZE_SERVICE: &str = "GeofencingPlugin.initializeService";
pub const REGISTER_GEOFENCE: &str = "GeofencingPlugin.registerGeofence";
pub const REMOVE_GEOFENCE: &str = "GeofencingPlugin.removeGeofence";
pub const GET_REGISTERED_GEOFENCE_IDS: &str = "GeofencingPlugin.getRegisteredGeofenceIds";

/// Errors decoding an inbound call
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Invalid arguments for '{method}': {reason}")]
    InvalidArguments { method: String, reason: String },
}

/// A request from the host runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
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

/// Reply to a [`MethodCall`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { value: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<ChannelError> for MethodResponse {
    fn from(err: ChannelError) -> Self {
        Self::Error {
            code: "invalid_arguments".to_string(),
            message: err.to_string(),
        }
    }
}

/// Decoded form of the four supported calls
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Initialize { dispatcher_token: i64 },
    Register(GeofenceSpec),
    Remove { id: String },
    GetRegisteredIds,
}

impl Request {
    /// Decode a call; `Ok(None)` for an unknown method
    pub fn decode(call: &MethodCall) -> Result<Option<Self>, ChannelError> {
        let invalid = |reason: String| ChannelError::InvalidArguments {
            method: call.method.clone(),
            reason,
        };

        let request = match call.method.as_str() {
            INITIALIZE_SERVICE => {
                let dispatcher_token = first_arg(&call.arguments)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| invalid("expected [dispatcherToken: int]".to_string()))?;
                Self::Initialize { dispatcher_token }
            }
            REGISTER_GEOFENCE => {
                let spec = GeofenceSpec::from_args(call.arguments.clone())
                    .map_err(|e| invalid(e.to_string()))?;
                Self::Register(spec)
            }
            REMOVE_GEOFENCE => {
                let id = first_arg(&call.arguments)
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("expected [id: string]".to_string()))?;
                Self::Remove { id: id.to_string() }
            }
            GET_REGISTERED_GEOFENCE_IDS => Self::GetRegisteredIds,
            _ => return Ok(None),
        };

        Ok(Some(request))
    }
}

fn first_arg(arguments: &Value) -> Option<&Value> {
    arguments.as_array().and_then(|args| args.first())
}

/// Run one inbound call to completion
pub async fn handle_method_call(
    coordinator: &GeofenceCoordinator,
    call: &MethodCall,
) -> MethodResponse {
    let request = match Request::decode(call) {
        Ok(Some(request)) => request,
        Ok(None) => {
            tracing::debug!(method = %call.method, "Unknown method");
            return MethodResponse::NotImplemented;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected method call");
            return e.into();
        }
    };

    let result = match request {
        Request::Initialize { dispatcher_token } => coordinator
            .initialize(dispatcher_token)
            .await
            .map(|()| Value::Bool(true)),
        Request::Register(spec) => coordinator
            .register(&spec, true)
            .await
            .map(|_| Value::Bool(true)),
        Request::Remove { id } => coordinator
            .unregister(&id)
            .await
            .map(|_| Value::Bool(true)),
        Request::GetRegisteredIds => coordinator.list_registered_ids().await.map(|ids| {
            let mut ids: Vec<String> = ids.into_iter().collect();
            ids.sort();
            Value::from(ids)
        }),
    };

    match result {
        Ok(value) => MethodResponse::success(value),
        Err(failure) => MethodResponse::Error {
            code: failure.code().to_string(),
            message: failure.to_string(),
        },
    }
}
