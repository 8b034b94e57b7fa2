//! Equipment entity (database row mapping).
//!
//! The current location, the RFID tag and the pending marker are stored as
//! flat columns on the equipment row.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::equipment::{
    Equipment, EquipmentCategory, EquipmentLocation, EquipmentStatus, PendingLocationChange,
    RfidTag, RfidTagStatus, UpdateMethod,
};
use domain::models::location_change::RequestedLocation;

/// Column list shared by every equipment SELECT / RETURNING clause.
pub const EQUIPMENT_COLUMNS: &str = r#"
    id, name, model, serial_number, asset_tag,
    rfid_tag_id, rfid_tag_status, rfid_last_detection,
    category, manufacturer, status, condition, notes,
    room_id, room_code, building, department, specific_location,
    location_updated_at, update_method,
    pending_request_id, pending_building, pending_room, pending_department,
    pending_specific_location, pending_requested_at,
    is_active, version, created_at, updated_at
"#;

/// Database row mapping for the equipment table.
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentEntity {
    pub id: Uuid,
    pub name: String,
    pub model: String,
    pub serial_number: String,
    pub asset_tag: Option<String>,
    pub rfid_tag_id: Option<String>,
    pub rfid_tag_status: Option<String>,
    pub rfid_last_detection: Option<DateTime<Utc>>,
    pub category: String,
    pub manufacturer: Option<String>,
    pub status: String,
    pub condition: String,
    pub notes: Option<String>,
    pub room_id: Option<Uuid>,
    pub room_code: Option<String>,
    pub building: Option<String>,
    pub department: Option<String>,
    pub specific_location: Option<String>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub update_method: String,
    pub pending_request_id: Option<Uuid>,
    pub pending_building: Option<String>,
    pub pending_room: Option<String>,
    pub pending_department: Option<String>,
    pub pending_specific_location: Option<String>,
    pub pending_requested_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentEntity {
    pub fn into_domain(self) -> Equipment {
        let rfid_tag = self.rfid_tag_id.map(|tag_id| RfidTag {
            tag_id,
            status: self
                .rfid_tag_status
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(RfidTagStatus::Active),
            last_detection: self.rfid_last_detection,
        });

        let pending_location_change = self.pending_request_id.map(|request_id| {
            PendingLocationChange {
                request_id,
                requested_location: RequestedLocation {
                    building: self.pending_building.unwrap_or_default(),
                    room: self.pending_room.unwrap_or_default(),
                    department: self.pending_department.unwrap_or_default(),
                    specific_location: self.pending_specific_location,
                },
                requested_at: self.pending_requested_at.unwrap_or(self.updated_at),
            }
        });

        Equipment {
            id: self.id,
            name: self.name,
            model: self.model,
            serial_number: self.serial_number,
            asset_tag: self.asset_tag,
            rfid_tag,
            category: self.category.parse().unwrap_or(EquipmentCategory::Other),
            manufacturer: self.manufacturer,
            status: self.status.parse().unwrap_or(EquipmentStatus::Available),
            condition: self.condition.parse().unwrap_or_default(),
            notes: self.notes,
            location: EquipmentLocation {
                room_id: self.room_id,
                room_code: self.room_code,
                building: self.building,
                department: self.department,
                specific_location: self.specific_location,
                last_updated: self.location_updated_at,
                update_method: self.update_method.parse().unwrap_or(UpdateMethod::System),
            },
            pending_location_change,
            is_active: self.is_active,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<EquipmentEntity> for Equipment {
    fn from(entity: EquipmentEntity) -> Self {
        entity.into_domain()
    }
}
