//! Room directory endpoint handlers.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use serde::Serialize;

use domain::models::Room;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub success: bool,
    pub rooms: Vec<Room>,
    pub total: usize,
}

impl From<Vec<Room>> for RoomListResponse {
    fn from(rooms: Vec<Room>) -> Self {
        Self {
            success: true,
            total: rooms.len(),
            rooms,
        }
    }
}

/// GET /api/v1/rooms
///
/// Active rooms ordered by code.
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<RoomListResponse>, ApiError> {
    Ok(Json(state.services.rooms.list().await?.into()))
}

/// GET /api/v1/rooms/type/:room_type
pub async fn rooms_by_type(
    State(state): State<AppState>,
    room_type: Result<Path<String>, PathRejection>,
) -> Result<Json<RoomListResponse>, ApiError> {
    let Path(room_type) = room_type?;
    Ok(Json(state.services.rooms.list_by_type(&room_type).await?.into()))
}

/// GET /api/v1/rooms/building/:building
///
/// Case-insensitive substring match on the building name.
pub async fn rooms_by_building(
    State(state): State<AppState>,
    building: Result<Path<String>, PathRejection>,
) -> Result<Json<RoomListResponse>, ApiError> {
    let Path(building) = building?;
    Ok(Json(
        state.services.rooms.list_by_building(&building).await?.into(),
    ))
}

/// GET /api/v1/rooms/:code
pub async fn get_room(
    State(state): State<AppState>,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<Room>, ApiError> {
    let Path(code) = code?;
    Ok(Json(state.services.rooms.find_by_code(&code).await?))
}
