//! Equipment registry endpoint handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use domain::models::equipment::{
    Equipment, EquipmentCategory, EquipmentCondition, EquipmentFilter, EquipmentStatus,
    EquipmentSummary, EquipmentUpdate, NewEquipment, StatusUpdate,
};
use domain::services::EquipmentRef;
use shared::pagination::{PageRequest, Pagination};

use crate::app::AppState;
use crate::error::ApiError;

/// Query parameters for equipment listing. Spelled out rather than
/// flattened because query strings carry numbers as text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEquipmentQuery {
    pub category: Option<EquipmentCategory>,
    pub status: Option<EquipmentStatus>,
    pub condition: Option<EquipmentCondition>,
    pub department: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListEquipmentQuery {
    fn split(self) -> (EquipmentFilter, PageRequest) {
        let defaults = PageRequest::default();
        (
            EquipmentFilter {
                category: self.category,
                status: self.status,
                condition: self.condition,
                department: self.department,
                search: self.search,
            },
            PageRequest {
                page: self.page.unwrap_or(defaults.page),
                per_page: self.per_page.unwrap_or(defaults.per_page),
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ListEquipmentResponse {
    pub equipment: Vec<Equipment>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct DecommissionResponse {
    pub message: String,
    pub equipment: EquipmentSummary,
}

/// GET /api/v1/equipment?category=&status=&condition=&department=&search=&page=&perPage=
pub async fn list_equipment(
    State(state): State<AppState>,
    query: Result<Query<ListEquipmentQuery>, QueryRejection>,
) -> Result<Json<ListEquipmentResponse>, ApiError> {
    let Query(query) = query?;
    let (filter, page) = query.split();
    let (equipment, total) = state.services.registry.list(&filter, &page).await?;

    Ok(Json(ListEquipmentResponse {
        equipment,
        pagination: Pagination::new(&page, total),
    }))
}

/// POST /api/v1/equipment
pub async fn create_equipment(
    State(state): State<AppState>,
    payload: Result<Json<NewEquipment>, JsonRejection>,
) -> Result<(StatusCode, Json<Equipment>), ApiError> {
    let Json(input) = payload?;
    let equipment = state.services.registry.register(input).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// GET /api/v1/equipment/:equipment_ref
///
/// Accepts an id, serial number or asset tag.
pub async fn get_equipment(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
) -> Result<Json<Equipment>, ApiError> {
    let Path(reference) = reference?;
    let equipment = state
        .services
        .registry
        .get(&EquipmentRef::parse(&reference)?)
        .await?;
    Ok(Json(equipment))
}

/// PUT /api/v1/equipment/:equipment_ref
pub async fn update_equipment(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
    payload: Result<Json<EquipmentUpdate>, JsonRejection>,
) -> Result<Json<Equipment>, ApiError> {
    let Path(reference) = reference?;
    let Json(update) = payload?;
    let registry = &state.services.registry;

    let current = registry.get(&EquipmentRef::parse(&reference)?).await?;
    let updated = registry.update(current.id, update).await?;
    Ok(Json(updated))
}

/// PUT /api/v1/equipment/:equipment_ref/status
pub async fn update_status(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Equipment>, ApiError> {
    let Path(reference) = reference?;
    let Json(update) = payload?;
    let registry = &state.services.registry;

    let current = registry.get(&EquipmentRef::parse(&reference)?).await?;
    let updated = registry.update_status(current.id, update).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/equipment/:equipment_ref
///
/// Soft delete; history and requests stay. Refused while a location change
/// request is pending.
pub async fn decommission_equipment(
    State(state): State<AppState>,
    reference: Result<Path<String>, PathRejection>,
) -> Result<Json<DecommissionResponse>, ApiError> {
    let Path(reference) = reference?;
    let registry = &state.services.registry;

    let current = registry.get(&EquipmentRef::parse(&reference)?).await?;
    let equipment = registry.decommission(current.id).await?;
    Ok(Json(DecommissionResponse {
        message: format!("Equipment {} decommissioned", equipment.serial_number),
        equipment: equipment.summary(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_split_defaults() {
        let (filter, page) = ListEquipmentQuery::default().split();
        assert!(filter.category.is_none());
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
    }

    #[test]
    fn test_list_query_split_carries_values() {
        let query = ListEquipmentQuery {
            status: Some(EquipmentStatus::Maintenance),
            condition: Some(EquipmentCondition::Fair),
            search: Some("scope".to_string()),
            page: Some(3),
            per_page: Some(5),
            ..Default::default()
        };
        let (filter, page) = query.split();
        assert_eq!(filter.status, Some(EquipmentStatus::Maintenance));
        assert_eq!(filter.condition, Some(EquipmentCondition::Fair));
        assert_eq!(filter.search.as_deref(), Some("scope"));
        assert_eq!(page.offset(), 10);
    }
}
