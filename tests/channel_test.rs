//! End-to-end tests for inbound method calls

mod common;

use common::{coordinator_with, provider_list, ScriptedProvider};
use geofencing::cache::GeofenceCache;
use geofencing::channel::{
    handle_method_call, MethodCall, MethodResponse, GET_REGISTERED_GEOFENCE_IDS,
    INITIALIZE_SERVICE, REGISTER_GEOFENCE, REMOVE_GEOFENCE,
};
use geofencing::coordinator::{GeofenceCoordinator, PermissionGate};
use geofencing::provider::ProviderError;
use geofencing::storage::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;

fn register_call(id: &str) -> MethodCall {
    MethodCall::new(
        REGISTER_GEOFENCE,
        json!([99, id, 37.0, -122.0, 100.0, 3, 1, -1, 0, 0]),
    )
}

fn success(value: Value) -> MethodResponse {
    MethodResponse::Success { value }
}

#[tokio::test]
async fn test_full_session() {
    let primary = ScriptedProvider::succeeding("primary");
    let coordinator = coordinator_with(&[&primary]);

    let response =
        handle_method_call(&coordinator, &MethodCall::new(INITIALIZE_SERVICE, json!([42]))).await;
    assert_eq!(response, success(json!(true)));
    assert_eq!(coordinator.dispatcher_token().await.unwrap(), Some(42));

    for id in ["zeta", "alpha"] {
        let response = handle_method_call(&coordinator, &register_call(id)).await;
        assert_eq!(response, success(json!(true)));
    }

    let list = MethodCall::new(GET_REGISTERED_GEOFENCE_IDS, Value::Null);
    let response = handle_method_call(&coordinator, &list).await;
    assert_eq!(response, success(json!(["alpha", "zeta"])));

    let response = handle_method_call(
        &coordinator,
        &MethodCall::new(REMOVE_GEOFENCE, json!(["zeta"])),
    )
    .await;
    assert_eq!(response, success(json!(true)));

    let response = handle_method_call(&coordinator, &list).await;
    assert_eq!(response, success(json!(["alpha"])));

    let (spec, callback) = &primary.added()[0];
    assert_eq!(spec.id, "zeta");
    assert_eq!(callback.callback_token, 99);
}

#[tokio::test]
async fn test_provider_failure_is_encoded_as_error() {
    let primary = ScriptedProvider::failing("primary", ProviderError::Transport("offline".into()));
    let secondary =
        ScriptedProvider::failing("secondary", ProviderError::rejected(1000, "not available"));
    let coordinator = coordinator_with(&[&primary, &secondary]);

    let response = handle_method_call(&coordinator, &register_call("gf1")).await;

    match response {
        MethodResponse::Error { code, message } => {
            assert_eq!(code, "provider_rejected");
            assert!(message.contains("not available"));
        }
        other => panic!("expected error response, got {other:?}"),
    }
    assert!(coordinator.list_registered_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_arguments() {
    let primary = ScriptedProvider::succeeding("primary");
    let coordinator = coordinator_with(&[&primary]);

    let call = MethodCall::new(REGISTER_GEOFENCE, json!([99, "gf1", 37.0]));
    let response = handle_method_call(&coordinator, &call).await;

    assert!(matches!(
        response,
        MethodResponse::Error { ref code, .. } if code == "invalid_arguments"
    ));
    assert!(primary.added().is_empty());
}

#[tokio::test]
async fn test_unknown_method_is_not_implemented() {
    let primary = ScriptedProvider::succeeding("primary");
    let coordinator = coordinator_with(&[&primary]);

    let call = MethodCall::new("GeofencingPlugin.promoteToForeground", json!([]));
    assert_eq!(
        handle_method_call(&coordinator, &call).await,
        MethodResponse::NotImplemented
    );
}

struct NoLocationPermission;

impl PermissionGate for NoLocationPermission {
    fn has_location_permission(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_permission_denied_skips_providers() {
    let primary = ScriptedProvider::succeeding("primary");
    let coordinator = GeofenceCoordinator::new(
        Arc::new(GeofenceCache::new(MemoryStore::new())),
        provider_list(&[&primary]),
    )
    .with_permission_gate(Arc::new(NoLocationPermission));

    let response = handle_method_call(&coordinator, &register_call("gf1")).await;

    match response {
        MethodResponse::Error { code, message } => {
            assert_eq!(code, "permission_denied");
            assert!(message.contains("ACCESS_FINE_LOCATION"));
        }
        other => panic!("expected error response, got {other:?}"),
    }
    assert!(primary.added().is_empty());
}
