//! Integration tests for the room directory, health probes and the
//! middleware stack shared by every route.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use common::{create_test_app, create_test_app_with_feed, get_request, test_config};

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn test_list_rooms_ordered_by_code() {
    let app = create_test_app().await;

    let (status, body) = app.send(get_request("/api/v1/rooms")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    let codes: Vec<&str> = body["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["LAB-101", "LAB-102", "OFF-201", "STORE-01"]);
}

#[tokio::test]
async fn test_rooms_by_type() {
    let app = create_test_app().await;

    let (status, body) = app.send(get_request("/api/v1/rooms/type/lab")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["rooms"][0]["roomType"], "lab");

    let (status, body) = app.send(get_request("/api/v1/rooms/type/dungeon")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_rooms_by_building_substring() {
    let app = create_test_app().await;

    let (status, body) = app.send(get_request("/api/v1/rooms/building/north")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["rooms"][0]["code"], "OFF-201");
}

#[tokio::test]
async fn test_get_room_by_code() {
    let app = create_test_app().await;

    let (status, body) = app.send(get_request("/api/v1/rooms/lab-101")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "LAB-101");
    assert_eq!(body["rfidReaders"][0]["readerId"], "RDR-LAB-101");

    let (status, body) = app.send(get_request("/api/v1/rooms/CELLAR")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Room not found: CELLAR");
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_memory_storage() {
    let app = create_test_app().await;

    let (status, body) = app.send(get_request("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert!(body.get("database").is_none());
    assert!(body.get("detection_feed").is_none());
}

#[tokio::test]
async fn test_health_reports_feed() {
    let (app, feed) = create_test_app_with_feed(test_config()).await;

    let (_, body) = app.send(get_request("/api/health")).await;
    assert_eq!(body["detection_feed"]["running"], true);
    assert_eq!(body["detection_feed"]["capacity"], 16);

    feed.stop().await;
    let (_, body) = app.send(get_request("/api/health")).await;
    assert_eq!(body["detection_feed"]["running"], false);
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let app = create_test_app().await;

    let (status, body) = app.send(get_request("/api/health/live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");

    let (status, body) = app.send(get_request("/api/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

// ============================================================================
// Middleware
// ============================================================================

#[tokio::test]
async fn test_security_headers_present() {
    let app = create_test_app().await;

    let response = tower::ServiceExt::oneshot(app.router.clone(), get_request("/api/v1/rooms"))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store");
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_hsts_when_enabled() {
    let mut config = test_config();
    config.security.hsts_enabled = true;
    let app = common::create_test_app_with(config).await;

    let response = tower::ServiceExt::oneshot(app.router.clone(), get_request("/api/health"))
        .await
        .unwrap();

    assert!(response.headers().contains_key("strict-transport-security"));
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = create_test_app().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health/live")
        .header("X-Request-ID", "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-abc");

    let response = tower::ServiceExt::oneshot(app.router.clone(), get_request("/api/health/live"))
        .await
        .unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_test_app().await;

    let (status, _) = app.send(get_request("/api/v1/teleporters")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
