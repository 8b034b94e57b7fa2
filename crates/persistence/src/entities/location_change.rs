//! Location change request entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::location_change::{
    EquipmentInfo, LocationChangeRequest, LocationSnapshot, RequestStatus, RequestedLocation,
    Requester, Reviewer,
};

/// Column list shared by every request SELECT clause.
pub const REQUEST_COLUMNS: &str = r#"
    id, equipment_id, equipment_name, equipment_serial_number, equipment_model,
    current_room_id, current_room_code, current_building, current_department,
    current_specific_location,
    requested_building, requested_room, requested_department, requested_specific_location,
    request_type, reason, requested_by_name, requested_by_department, priority, notes,
    status, reviewed_by_name, reviewed_by_role, review_date, review_notes, effective_date,
    approval_room_id, approval_room_code, approval_building, approval_department,
    approval_specific_location,
    created_at, updated_at
"#;

/// Database row mapping for the location_change_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationChangeEntity {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub equipment_name: String,
    pub equipment_serial_number: String,
    pub equipment_model: String,
    pub current_room_id: Option<Uuid>,
    pub current_room_code: Option<String>,
    pub current_building: Option<String>,
    pub current_department: Option<String>,
    pub current_specific_location: Option<String>,
    pub requested_building: String,
    pub requested_room: String,
    pub requested_department: String,
    pub requested_specific_location: Option<String>,
    pub request_type: String,
    pub reason: String,
    pub requested_by_name: String,
    pub requested_by_department: String,
    pub priority: String,
    pub notes: Option<String>,
    pub status: String,
    pub reviewed_by_name: Option<String>,
    pub reviewed_by_role: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub approval_room_id: Option<Uuid>,
    pub approval_room_code: Option<String>,
    pub approval_building: Option<String>,
    pub approval_department: Option<String>,
    pub approval_specific_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocationChangeEntity {
    pub fn into_domain(self) -> LocationChangeRequest {
        // The approval snapshot is only ever written together with the
        // effective date.
        let location_at_approval = self.effective_date.map(|_| LocationSnapshot {
            room_id: self.approval_room_id,
            room_code: self.approval_room_code,
            building: self.approval_building,
            department: self.approval_department,
            specific_location: self.approval_specific_location,
        });
        let reviewed_by = self.reviewed_by_name.map(|user_name| Reviewer {
            user_name,
            role: self.reviewed_by_role.unwrap_or_default(),
        });

        LocationChangeRequest {
            id: self.id,
            equipment_id: self.equipment_id,
            equipment_info: EquipmentInfo {
                name: self.equipment_name,
                serial_number: self.equipment_serial_number,
                model: self.equipment_model,
            },
            current_location: LocationSnapshot {
                room_id: self.current_room_id,
                room_code: self.current_room_code,
                building: self.current_building,
                department: self.current_department,
                specific_location: self.current_specific_location,
            },
            requested_location: RequestedLocation {
                building: self.requested_building,
                room: self.requested_room,
                department: self.requested_department,
                specific_location: self.requested_specific_location,
            },
            request_type: self.request_type.parse().unwrap_or_default(),
            reason: self.reason,
            requested_by: Requester {
                user_name: self.requested_by_name,
                department: self.requested_by_department,
            },
            priority: self.priority.parse().unwrap_or_default(),
            notes: self.notes,
            status: self.status.parse().unwrap_or(RequestStatus::Pending),
            reviewed_by,
            review_date: self.review_date,
            review_notes: self.review_notes,
            effective_date: self.effective_date,
            location_at_approval,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<LocationChangeEntity> for LocationChangeRequest {
    fn from(entity: LocationChangeEntity) -> Self {
        entity.into_domain()
    }
}
