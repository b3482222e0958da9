//! Integration tests for RegistryClient
//!
//! These tests run the client against an in-process fake registry served
//! by axum on a loopback port. They cover the request shapes the registry
//! expects and the way failures surface.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use periphery_core::Peripheral;
use periphery_network::{RegistryApi, RegistryClient, RegistryClientConfig, RegistryError};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeRegistry {
    records: BTreeMap<String, Value>,
    requests: Vec<String>,
    healthy: bool,
    reject_writes: bool,
}

type Shared = Arc<Mutex<FakeRegistry>>;

async fn healthcheck(State(state): State<Shared>) -> StatusCode {
    if state.lock().unwrap().healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn list(
    State(state): State<Shared>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<Value> {
    let mut registry = state.lock().unwrap();
    registry.requests.push(format!(
        "GET parameter={} value={}",
        query.get("parameter").map(String::as_str).unwrap_or(""),
        query.get("value").map(String::as_str).unwrap_or("")
    ));

    let listing: serde_json::Map<String, Value> = registry
        .records
        .iter()
        .filter(|(_, record)| record["interface"] == "USB")
        .map(|(key, record)| (key.clone(), record.clone()))
        .collect();
    Json(Value::Object(listing))
}

async fn create(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    let mut registry = state.lock().unwrap();
    let identifier = body["identifier"].as_str().unwrap_or_default().to_string();
    registry.requests.push(format!("POST {identifier}"));
    if registry.reject_writes {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if registry.records.contains_key(&identifier) {
        return StatusCode::CONFLICT;
    }

    let mut stored = body;
    stored["id"] = json!(format!("peripheral/{identifier}"));
    stored["version"] = json!(1);
    stored["parent"] = json!("nuvlabox/1");
    registry.records.insert(identifier, stored);
    StatusCode::CREATED
}

async fn update(
    State(state): State<Shared>,
    Path(identifier): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut registry = state.lock().unwrap();
    registry.requests.push(format!("PUT {identifier}"));
    if registry.reject_writes {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    match registry.records.get_mut(&identifier) {
        Some(record) => {
            *record = body;
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn remove(State(state): State<Shared>, Path(identifier): Path<String>) -> StatusCode {
    let mut registry = state.lock().unwrap();
    registry.requests.push(format!("DELETE {identifier}"));
    match registry.records.remove(&identifier) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

/// Start the fake registry and return its state and a client pointed at it
async fn start_registry(registry: FakeRegistry) -> (Shared, RegistryClient) {
    let state = Arc::new(Mutex::new(registry));
    let app = Router::new()
        .route("/api/healthcheck", get(healthcheck))
        .route("/api/peripheral", get(list).post(create))
        .route("/api/peripheral/:identifier", put(update).delete(remove))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = RegistryClient::new(RegistryClientConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_millis(1000),
    })
    .unwrap();

    (state, client)
}

fn webcam() -> Peripheral {
    Peripheral::new("046d:0825", "Webcam C270")
        .with_description("USB 046d:0825 Webcam C270 - Miscellaneous Device")
        .with_classes(vec!["Video (Video Control)".to_string()])
        .with_vendor("Logitech, Inc.")
        .with_product("Webcam C270")
        .with_device_path("/dev/bus/usb/001/004")
}

#[tokio::test]
async fn test_healthcheck_reflects_registry_state() {
    let (state, client) = start_registry(FakeRegistry::default()).await;
    assert!(!client.is_healthy().await);

    state.lock().unwrap().healthy = true;
    assert!(client.is_healthy().await);
}

#[tokio::test]
async fn test_fetch_sends_interface_filter() {
    let (state, client) = start_registry(FakeRegistry::default()).await;

    let listing = client.fetch_usb_peripherals().await.unwrap();
    assert!(listing.is_empty());
    assert_eq!(
        state.lock().unwrap().requests,
        vec!["GET parameter=interface value=USB"]
    );
}

#[tokio::test]
async fn test_create_then_fetch_carries_registry_metadata() {
    let (state, client) = start_registry(FakeRegistry::default()).await;

    client.create(&webcam()).await.unwrap();

    let listing = client.fetch_usb_peripherals().await.unwrap();
    let record = &listing["046d:0825"];
    assert_eq!(record.version, Some(1));
    assert_eq!(record.parent.as_deref(), Some("nuvlabox/1"));
    assert!(record.matches(&webcam()));

    // Unresolved optional fields are left out of the body.
    let stored = state.lock().unwrap().records["046d:0825"].clone();
    assert_eq!(stored["serial-number"], Value::Null);
    assert_eq!(stored["device-path"], "/dev/bus/usb/001/004");
}

#[tokio::test]
async fn test_update_replaces_record() {
    let (state, client) = start_registry(FakeRegistry::default()).await;
    client.create(&webcam()).await.unwrap();

    let moved = webcam().with_device_path("/dev/bus/usb/002/009");
    client.update("046d:0825", &moved).await.unwrap();

    let stored = state.lock().unwrap().records["046d:0825"].clone();
    assert_eq!(stored["device-path"], "/dev/bus/usb/002/009");
    assert!(stored.get("version").is_none());
}

#[tokio::test]
async fn test_delete_removes_record() {
    let (state, client) = start_registry(FakeRegistry::default()).await;
    client.create(&webcam()).await.unwrap();

    client.delete("046d:0825").await.unwrap();

    let registry = state.lock().unwrap();
    assert!(registry.records.is_empty());
    assert_eq!(
        registry.requests,
        vec!["POST 046d:0825", "DELETE 046d:0825"]
    );
}

#[tokio::test]
async fn test_listing_identifier_falls_back_to_key() {
    let mut registry = FakeRegistry::default();
    registry.records.insert(
        "1d6b:0002".to_string(),
        json!({"name": "root hub", "interface": "USB", "available": true}),
    );
    let (_state, client) = start_registry(registry).await;

    let listing = client.fetch_usb_peripherals().await.unwrap();
    assert_eq!(listing["1d6b:0002"].peripheral.identifier, "1d6b:0002");
}

#[tokio::test]
async fn test_non_usb_records_are_not_listed() {
    let mut registry = FakeRegistry::default();
    registry.records.insert(
        "gpio".to_string(),
        json!({"identifier": "gpio", "name": "GPIO", "interface": "GPIO"}),
    );
    let (_state, client) = start_registry(registry).await;

    assert!(client.fetch_usb_peripherals().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_write_surfaces_status() {
    let registry = FakeRegistry {
        reject_writes: true,
        ..FakeRegistry::default()
    };
    let (_state, client) = start_registry(registry).await;

    let result = client.create(&webcam()).await;
    assert!(matches!(
        result,
        Err(RegistryError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_delete_unknown_identifier_is_an_error() {
    let (_state, client) = start_registry(FakeRegistry::default()).await;

    let result = client.delete("ffff:ffff").await;
    assert!(matches!(
        result,
        Err(RegistryError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_malformed_listing_is_a_decode_error() {
    let app = Router::new().route("/api/peripheral", get(|| async { "not json" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = RegistryClient::new(RegistryClientConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_millis(1000),
    })
    .unwrap();

    let result = client.fetch_usb_peripherals().await;
    assert!(matches!(result, Err(RegistryError::Decode(_))));
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let app = Router::new().route(
        "/api/peripheral",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = RegistryClient::new(RegistryClientConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_millis(100),
    })
    .unwrap();

    let result = client.fetch_usb_peripherals().await;
    assert!(matches!(result, Err(RegistryError::Timeout(100))));
}

#[tokio::test]
async fn test_unreachable_registry_is_a_transport_error() {
    // Bind and drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RegistryClient::new(RegistryClientConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_millis(1000),
    })
    .unwrap();

    assert!(!client.is_healthy().await);
    assert!(matches!(
        client.create(&webcam()).await,
        Err(RegistryError::Transport(_))
    ));
}
