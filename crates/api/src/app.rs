use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::CoreServices;

use crate::config::Config;
use crate::jobs::DetectionSender;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, security_headers_middleware,
    trace_id, RateLimiterState,
};
use crate::routes::{equipment, health, location_change, movements, rooms};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub services: CoreServices,
    /// Absent when the services run over the in-memory store.
    pub pool: Option<PgPool>,
    pub detection_feed: Option<DetectionSender>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(config: Config, services: CoreServices) -> Self {
        let rate_limiter =
            RateLimiterState::new(config.security.detection_rate_limit_per_minute).map(Arc::new);
        Self {
            config: Arc::new(config),
            services,
            pool: None,
            detection_feed: None,
            rate_limiter,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_detection_feed(mut self, sender: DetectionSender) -> Self {
        self.detection_feed = Some(sender);
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Reader-facing endpoints carry their own budget
    let detection_routes = Router::new()
        .route(
            "/api/v1/movements/rfid-detection",
            post(movements::rfid_detection),
        )
        .route(
            "/api/v1/movements/rfid-detection/batch",
            post(movements::rfid_detection_batch),
        )
        .route(
            "/api/v1/movements/rfid-detection/feed",
            post(movements::enqueue_detection),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .route(
            "/api/v1/equipment",
            get(equipment::list_equipment).post(equipment::create_equipment),
        )
        .route(
            "/api/v1/equipment/:equipment_ref",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::decommission_equipment),
        )
        .route(
            "/api/v1/equipment/:equipment_ref/status",
            put(equipment::update_status),
        )
        .route(
            "/api/v1/movements/equipment/:equipment_ref/move",
            post(movements::move_equipment),
        )
        .route(
            "/api/v1/movements/equipment/:equipment_ref/history",
            get(movements::movement_history),
        )
        .route(
            "/api/v1/location-change",
            post(location_change::create_request),
        )
        .route(
            "/api/v1/location-change/pending",
            get(location_change::pending_requests),
        )
        .route(
            "/api/v1/location-change/history/:equipment_id",
            get(location_change::equipment_history),
        )
        .route(
            "/api/v1/location-change/:id",
            get(location_change::get_request),
        )
        .route(
            "/api/v1/location-change/:id/approve",
            put(location_change::approve_request),
        )
        .route(
            "/api/v1/location-change/:id/reject",
            put(location_change::reject_request),
        )
        .route(
            "/api/v1/location-change/:id/cancel",
            put(location_change::cancel_request),
        )
        .route("/api/v1/rooms", get(rooms::list_rooms))
        .route("/api/v1/rooms/type/:room_type", get(rooms::rooms_by_type))
        .route(
            "/api/v1/rooms/building/:building",
            get(rooms::rooms_by_building),
        )
        .route("/api/v1/rooms/:code", get(rooms::get_room));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Global middleware (order matters: bottom layers run first)
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(detection_routes)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
