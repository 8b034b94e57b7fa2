//! Location change request endpoint handlers.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use domain::models::equipment::Equipment;
use domain::models::location_change::{LocationChangeRequest, NewLocationChange, ReviewInput};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct RequestResponse {
    pub success: bool,
    pub message: String,
    pub request: LocationChangeRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub success: bool,
    pub message: String,
    pub request: LocationChangeRequest,
    pub equipment: Equipment,
    /// The item moved after the request was filed.
    pub location_drifted: bool,
}

#[derive(Debug, Serialize)]
pub struct RequestListResponse {
    pub success: bool,
    pub requests: Vec<LocationChangeRequest>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentHistoryResponse {
    pub success: bool,
    pub equipment_id: Uuid,
    pub history: Vec<LocationChangeRequest>,
    pub total: usize,
}

/// Review bodies are optional; an empty body means no reviewer and no notes.
fn parse_review(body: &Bytes) -> Result<ReviewInput, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReviewInput::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid review body: {}", e)))
}

/// POST /api/v1/location-change
pub async fn create_request(
    State(state): State<AppState>,
    payload: Result<Json<NewLocationChange>, JsonRejection>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    let Json(input) = payload?;
    let request = state.services.workflow.create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RequestResponse {
            success: true,
            message: format!(
                "Location change to {} requested",
                request.requested_location.room
            ),
            request,
        }),
    ))
}

/// GET /api/v1/location-change/pending
pub async fn pending_requests(
    State(state): State<AppState>,
) -> Result<Json<RequestListResponse>, ApiError> {
    let requests = state.services.workflow.pending().await?;
    Ok(Json(RequestListResponse {
        success: true,
        total: requests.len(),
        requests,
    }))
}

/// GET /api/v1/location-change/:id
pub async fn get_request(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<LocationChangeRequest>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.services.workflow.get(id).await?))
}

/// PUT /api/v1/location-change/:id/approve
pub async fn approve_request(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<ApprovalResponse>, ApiError> {
    let Path(id) = id?;
    let review = parse_review(&body)?;
    let outcome = state.services.workflow.approve(id, review).await?;

    let message = if outcome.location_drifted {
        format!(
            "Location change approved; equipment had moved since the request and is now set to {}",
            outcome.request.requested_location.room
        )
    } else {
        format!(
            "Location change approved; equipment is now in {}",
            outcome.request.requested_location.room
        )
    };

    Ok(Json(ApprovalResponse {
        success: true,
        message,
        request: outcome.request,
        equipment: outcome.equipment,
        location_drifted: outcome.location_drifted,
    }))
}

/// PUT /api/v1/location-change/:id/reject
pub async fn reject_request(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<RequestResponse>, ApiError> {
    let Path(id) = id?;
    let review = parse_review(&body)?;
    let request = state.services.workflow.reject(id, review).await?;

    Ok(Json(RequestResponse {
        success: true,
        message: "Location change rejected".to_string(),
        request,
    }))
}

/// PUT /api/v1/location-change/:id/cancel
pub async fn cancel_request(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<RequestResponse>, ApiError> {
    let Path(id) = id?;
    let review = parse_review(&body)?;
    let request = state.services.workflow.cancel(id, review).await?;

    Ok(Json(RequestResponse {
        success: true,
        message: "Location change cancelled".to_string(),
        request,
    }))
}

/// GET /api/v1/location-change/history/:equipment_id
///
/// Approved requests only, latest first.
pub async fn equipment_history(
    State(state): State<AppState>,
    equipment_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EquipmentHistoryResponse>, ApiError> {
    let Path(equipment_id) = equipment_id?;
    let history = state.services.workflow.history(equipment_id).await?;

    Ok(Json(EquipmentHistoryResponse {
        success: true,
        equipment_id,
        total: history.len(),
        history,
    }))
}
