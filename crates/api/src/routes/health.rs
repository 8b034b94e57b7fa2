//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `postgres` or `memory`.
    pub storage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_feed: Option<FeedHealth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedHealth {
    pub running: bool,
    pub queued: usize,
    pub capacity: usize,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// `None` when no database is configured.
async fn probe_database(state: &AppState) -> Option<DatabaseHealth> {
    let pool = state.pool.as_ref()?;
    let health = match persistence::db::ping(pool).await {
        Ok(latency) => DatabaseHealth {
            connected: true,
            latency_ms: Some(latency.as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health probe failed");
            DatabaseHealth {
                connected: false,
                latency_ms: None,
            }
        }
    };
    Some(health)
}

/// Full health report: storage connectivity and detection feed backlog.
/// 503 when the database is configured but unreachable.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let database = probe_database(&state).await;
    let healthy = database.as_ref().map_or(true, |db| db.connected);

    let detection_feed = state.detection_feed.as_ref().map(|feed| FeedHealth {
        running: !feed.is_closed(),
        queued: feed.queued(),
        capacity: feed.capacity(),
    });

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: if state.pool.is_some() { "postgres" } else { "memory" },
        database,
        detection_feed,
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Ready once storage answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match probe_database(&state).await {
        Some(DatabaseHealth {
            connected: false, ..
        }) => Err(StatusCode::SERVICE_UNAVAILABLE),
        _ => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization_skips_absent_sections() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.3.0".to_string(),
            storage: "memory",
            database: None,
            detection_feed: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["storage"], "memory");
        assert!(value.get("database").is_none());
        assert!(value.get("detection_feed").is_none());
    }

    #[test]
    fn test_database_health_fields() {
        let value = serde_json::to_value(DatabaseHealth {
            connected: true,
            latency_ms: Some(4),
        })
        .unwrap();
        assert_eq!(value["connected"], true);
        assert_eq!(value["latency_ms"], 4);
    }
}
