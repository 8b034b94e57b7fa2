//! Common test utilities for integration tests.
//!
//! The router runs over the in-memory store, so no database is needed.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use uuid::Uuid;

use domain::models::room::{ReaderType, RfidReader, Room, RoomStatus, RoomType};
use domain::services::{CoreServices, InMemoryStore};
use equipment_tracker_api::{
    app::{create_app, AppState},
    config::{
        Config, DatabaseConfig, DetectionConfig, LoggingConfig, SecurityConfig, ServerConfig,
    },
    jobs::{DetectionFeed, DetectionSender},
};

/// Config for router tests. Rate limiting is off unless a test turns it on.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 1_048_576,
            shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            detection_rate_limit_per_minute: 0,
            hsts_enabled: false,
        },
        detection: DetectionConfig {
            dedup_window_secs: 0,
            channel_capacity: 16,
            max_in_flight: 4,
            max_batch_size: 10,
        },
    }
}

pub fn room(code: &str, building: &str, room_type: RoomType, readers: &[&str]) -> Room {
    let now = Utc::now();
    Room {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: format!("Room {}", code),
        building: building.to_string(),
        department: format!("Dept {}", code),
        room_type,
        capacity: Some(12),
        status: RoomStatus::Active,
        is_active: true,
        rfid_readers: readers
            .iter()
            .map(|r| RfidReader {
                reader_id: r.to_string(),
                reader_type: ReaderType::Both,
                is_active: true,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

/// LAB-101 and LAB-102 (with readers), OFF-201 in the North Wing, and
/// STORE-01.
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store
        .seed_room(room("LAB-101", "Science Block", RoomType::Lab, &["RDR-LAB-101"]))
        .await;
    store
        .seed_room(room("LAB-102", "Science Block", RoomType::Lab, &["RDR-LAB-102"]))
        .await;
    store
        .seed_room(room("OFF-201", "North Wing", RoomType::Office, &[]))
        .await;
    store
        .seed_room(room("STORE-01", "Science Block", RoomType::Other, &[]))
        .await;
    store
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub services: CoreServices,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(&self.router, request).await
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(test_config()).await
}

pub async fn create_test_app_with(config: Config) -> TestApp {
    let store = seeded_store().await;
    let services = CoreServices::in_memory(store.clone(), config.detection.ingestion_settings());
    TestApp {
        router: create_app(AppState::new(config, services.clone())),
        store,
        services,
    }
}

/// A running detection feed wired to the app's services.
pub struct TestFeed {
    pub sender: DetectionSender,
    pub shutdown: watch::Sender<bool>,
    pub handle: JoinHandle<()>,
}

impl TestFeed {
    /// Stops the worker and waits until queued events are processed.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("feed did not stop")
            .unwrap();
    }
}

pub async fn create_test_app_with_feed(config: Config) -> (TestApp, TestFeed) {
    let store = seeded_store().await;
    let services = CoreServices::in_memory(store.clone(), config.detection.ingestion_settings());
    let (shutdown, shutdown_rx) = watch::channel(false);
    let (sender, handle) =
        DetectionFeed::spawn(services.ingestion.clone(), &config.detection, shutdown_rx);

    let state = AppState::new(config, services.clone()).with_detection_feed(sender.clone());
    let app = TestApp {
        router: create_app(state),
        store,
        services,
    };
    (
        app,
        TestFeed {
            sender,
            shutdown,
            handle,
        },
    )
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Registers an item through the API and returns its JSON.
pub async fn register_equipment(
    app: &TestApp,
    serial: &str,
    rfid_tag: Option<&str>,
    room_code: Option<&str>,
) -> Value {
    let name: String = CompanyName().fake();
    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/equipment",
            json!({
                "name": format!("{} analyzer", name).chars().take(100).collect::<String>(),
                "model": "AX-200",
                "serialNumber": serial,
                "rfidTag": rfid_tag,
                "category": "lab-equipment",
                "roomCode": room_code
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body
}

pub fn detection(reader: &str, tag: &str, event_type: &str) -> Value {
    json!({
        "readerId": reader,
        "equipmentTag": tag,
        "eventType": event_type
    })
}
