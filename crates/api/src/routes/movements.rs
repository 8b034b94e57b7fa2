//! Movement and RFID detection endpoint handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain::models::detection::{BatchOutcome, DetectionEvent, DetectionOutcome};
use domain::models::movement::{MovementReason, MovementRecord, RoomPointer};
use domain::services::{EquipmentRef, MoveCommand, MoveOutcome, MovementHistory, RoomRef};

use crate::app::AppState;
use crate::error::ApiError;
use crate::jobs::EnqueueError;
use crate::middleware::metrics::{detection_outcome_label, record_detection};
use crate::middleware::RequestId;

/// Body of a manual move. The room code wins when both are given.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub new_room_id: Option<Uuid>,
    pub new_room_code: Option<String>,
    /// Unknown values fall back to `manual`.
    pub reason: Option<String>,
    #[validate(length(max = 100, message = "movedBy cannot exceed 100 characters"))]
    pub moved_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentLocationView {
    pub room: Option<Uuid>,
    pub room_code: Option<String>,
    pub building: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousLocationView {
    pub room: Option<Uuid>,
    pub room_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedEquipmentView {
    pub id: Uuid,
    pub name: String,
    pub serial_number: String,
    pub version: i64,
    pub current_location: CurrentLocationView,
    pub previous_location: PreviousLocationView,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub success: bool,
    pub message: String,
    pub equipment: MovedEquipmentView,
    pub movement: MovementRecord,
}

impl From<MoveOutcome> for MoveResponse {
    fn from(outcome: MoveOutcome) -> Self {
        let MoveOutcome {
            equipment,
            previous_room,
            movement,
        } = outcome;
        let location = equipment.location;

        let message = format!(
            "Equipment moved from {} to {}",
            previous_room.as_ref().map(|r| r.code.as_str()).unwrap_or("None"),
            location.room_code.as_deref().unwrap_or("None"),
        );
        let (previous_id, previous_code) = match previous_room {
            Some(RoomPointer { id, code }) => (id, Some(code)),
            None => (None, None),
        };

        Self {
            success: true,
            message,
            equipment: MovedEquipmentView {
                id: equipment.id,
                name: equipment.name,
                serial_number: equipment.serial_number,
                version: equipment.version,
                current_location: CurrentLocationView {
                    room: location.room_id,
                    room_code: location.room_code,
                    building: location.building,
                    department: location.department,
                },
                previous_location: PreviousLocationView {
                    room: previous_id,
                    room_code: previous_code,
                },
            },
            movement,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovementHistoryResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub history: MovementHistory,
}

#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub success: bool,
    pub message: String,
    pub detection: DetectionOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetectionRequest {
    pub events: Vec<DetectionEvent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResponse {
    pub success: bool,
    pub queued: bool,
    pub request_id: String,
}

/// POST /api/v1/movements/equipment/:equipment_ref/move
pub async fn move_equipment(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<MoveResponse>, ApiError> {
    let Path(reference) = reference?;
    let Json(request) = payload?;
    request.validate()?;

    let command = MoveCommand {
        equipment: EquipmentRef::parse(&reference)?,
        target: RoomRef {
            id: request.new_room_id,
            code: request.new_room_code,
        },
        reason: MovementReason::parse_lenient(request.reason.as_deref()),
        moved_by: request.moved_by,
        detection: None,
    };

    let outcome = state.services.movement.move_equipment(command).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/v1/movements/equipment/:equipment_ref/history
pub async fn movement_history(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
) -> Result<Json<MovementHistoryResponse>, ApiError> {
    let Path(reference) = reference?;
    let history = state
        .services
        .movement
        .movement_history(&EquipmentRef::parse(&reference)?)
        .await?;

    Ok(Json(MovementHistoryResponse {
        success: true,
        message: format!("{} movements found", history.total),
        history,
    }))
}

/// POST /api/v1/movements/rfid-detection
pub async fn rfid_detection(
    State(state): State<AppState>,
    payload: Result<Json<DetectionEvent>, JsonRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let Json(event) = payload?;

    let outcome = match state.services.ingestion.handle(event).await {
        Ok(outcome) => outcome,
        Err(e) => {
            record_detection("http", "failed");
            return Err(e.into());
        }
    };
    record_detection("http", detection_outcome_label(&outcome));

    Ok(Json(DetectionResponse {
        success: true,
        message: format!(
            "RFID detection processed: {} - {} - {}",
            outcome.equipment.name, outcome.event_type, outcome.room.code
        ),
        detection: outcome,
    }))
}

/// POST /api/v1/movements/rfid-detection/batch
///
/// Every event is handled independently; the response reports each one.
pub async fn rfid_detection_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchDetectionRequest>, JsonRejection>,
) -> Result<Json<BatchOutcome>, ApiError> {
    let Json(request) = payload?;

    let max = state.config.detection.max_batch_size;
    if request.events.is_empty() {
        return Err(ApiError::Validation("events cannot be empty".to_string()));
    }
    if request.events.len() > max {
        return Err(ApiError::Validation(format!(
            "A batch may contain at most {} events",
            max
        )));
    }

    let outcome = state.services.ingestion.handle_batch(request.events).await;
    for item in &outcome.results {
        let label = item
            .outcome
            .as_ref()
            .map(detection_outcome_label)
            .unwrap_or("failed");
        record_detection("http_batch", label);
    }

    Ok(Json(outcome))
}

/// POST /api/v1/movements/rfid-detection/feed
///
/// Hands the event to the background feed and returns immediately.
pub async fn enqueue_detection(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<DetectionEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<QueuedResponse>), ApiError> {
    let Json(event) = payload?;
    let feed = state
        .detection_feed
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Detection feed is not running".into()))?;

    feed.try_enqueue(event).map_err(|e| match e {
        EnqueueError::Full => {
            ApiError::ServiceUnavailable("Detection queue is full, retry later".into())
        }
        EnqueueError::Closed => ApiError::ServiceUnavailable("Detection feed is shut down".into()),
    })?;
    tracing::debug!(request_id = %request_id.0, "Detection queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            success: true,
            queued: true,
            request_id: request_id.0,
        }),
    ))
}
