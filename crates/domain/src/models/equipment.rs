//! Equipment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use shared::validation::{normalize_identifier, normalize_optional_identifier, ROOM_CODE_REGEX};

use super::location_change::{LocationSnapshot, RequestedLocation};
use super::movement::{rfid_note, DetectionMeta, MovementReason, MovementRecord, RoomPointer};
use super::room::Room;
use crate::error::DomainError;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentCategory {
    Computers,
    Networking,
    LabEquipment,
    Medical,
    Industrial,
    OfficeEquipment,
    Vehicles,
    Tools,
    SafetyEquipment,
    Furniture,
    Electronics,
    Other,
}

impl EquipmentCategory {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentCategory::Computers => "computers",
            EquipmentCategory::Networking => "networking",
            EquipmentCategory::LabEquipment => "lab-equipment",
            EquipmentCategory::Medical => "medical",
            EquipmentCategory::Industrial => "industrial",
            EquipmentCategory::OfficeEquipment => "office-equipment",
            EquipmentCategory::Vehicles => "vehicles",
            EquipmentCategory::Tools => "tools",
            EquipmentCategory::SafetyEquipment => "safety-equipment",
            EquipmentCategory::Furniture => "furniture",
            EquipmentCategory::Electronics => "electronics",
            EquipmentCategory::Other => "other",
        }
    }
}

impl fmt::Display for EquipmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EquipmentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "computers" => Ok(EquipmentCategory::Computers),
            "networking" => Ok(EquipmentCategory::Networking),
            "lab-equipment" => Ok(EquipmentCategory::LabEquipment),
            "medical" => Ok(EquipmentCategory::Medical),
            "industrial" => Ok(EquipmentCategory::Industrial),
            "office-equipment" => Ok(EquipmentCategory::OfficeEquipment),
            "vehicles" => Ok(EquipmentCategory::Vehicles),
            "tools" => Ok(EquipmentCategory::Tools),
            "safety-equipment" => Ok(EquipmentCategory::SafetyEquipment),
            "furniture" => Ok(EquipmentCategory::Furniture),
            "electronics" => Ok(EquipmentCategory::Electronics),
            "other" => Ok(EquipmentCategory::Other),
            _ => Err(format!("Invalid equipment category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentStatus {
    Available,
    InUse,
    InTransit,
    Maintenance,
    OutOfService,
    Retired,
    Reserved,
    Lost,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::InUse => "in-use",
            EquipmentStatus::InTransit => "in-transit",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::OutOfService => "out-of-service",
            EquipmentStatus::Retired => "retired",
            EquipmentStatus::Reserved => "reserved",
            EquipmentStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(EquipmentStatus::Available),
            "in-use" => Ok(EquipmentStatus::InUse),
            "in-transit" => Ok(EquipmentStatus::InTransit),
            "maintenance" => Ok(EquipmentStatus::Maintenance),
            "out-of-service" => Ok(EquipmentStatus::OutOfService),
            "retired" => Ok(EquipmentStatus::Retired),
            "reserved" => Ok(EquipmentStatus::Reserved),
            "lost" => Ok(EquipmentStatus::Lost),
            _ => Err(format!("Invalid equipment status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    Critical,
}

impl EquipmentCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentCondition::Excellent => "excellent",
            EquipmentCondition::Good => "good",
            EquipmentCondition::Fair => "fair",
            EquipmentCondition::Poor => "poor",
            EquipmentCondition::Critical => "critical",
        }
    }
}

impl std::str::FromStr for EquipmentCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(EquipmentCondition::Excellent),
            "good" => Ok(EquipmentCondition::Good),
            "fair" => Ok(EquipmentCondition::Fair),
            "poor" => Ok(EquipmentCondition::Poor),
            "critical" => Ok(EquipmentCondition::Critical),
            _ => Err(format!("Invalid equipment condition: {}", s)),
        }
    }
}

/// How the current location was last set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    Manual,
    RfidAuto,
    QrScan,
    System,
}

impl UpdateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMethod::Manual => "manual",
            UpdateMethod::RfidAuto => "rfid_auto",
            UpdateMethod::QrScan => "qr_scan",
            UpdateMethod::System => "system",
        }
    }
}

impl std::str::FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(UpdateMethod::Manual),
            "rfid_auto" => Ok(UpdateMethod::RfidAuto),
            "qr_scan" => Ok(UpdateMethod::QrScan),
            "system" => Ok(UpdateMethod::System),
            _ => Err(format!("Invalid update method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfidTagStatus {
    Active,
    Inactive,
    Lost,
    Replaced,
}

impl RfidTagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RfidTagStatus::Active => "active",
            RfidTagStatus::Inactive => "inactive",
            RfidTagStatus::Lost => "lost",
            RfidTagStatus::Replaced => "replaced",
        }
    }
}

impl std::str::FromStr for RfidTagStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RfidTagStatus::Active),
            "inactive" => Ok(RfidTagStatus::Inactive),
            "lost" => Ok(RfidTagStatus::Lost),
            "replaced" => Ok(RfidTagStatus::Replaced),
            _ => Err(format!("Invalid RFID tag status: {}", s)),
        }
    }
}

// ============================================================================
// Domain Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidTag {
    pub tag_id: String,
    pub status: RfidTagStatus,
    #[serde(rename = "lastRFIDDetection")]
    pub last_detection: Option<DateTime<Utc>>,
}

/// Current location of an item. Room code, building and department are
/// denormalized copies of the room they were taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentLocation {
    pub room_id: Option<Uuid>,
    pub room_code: Option<String>,
    pub building: Option<String>,
    pub department: Option<String>,
    pub specific_location: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub update_method: UpdateMethod,
}

impl EquipmentLocation {
    pub fn unplaced() -> Self {
        Self {
            room_id: None,
            room_code: None,
            building: None,
            department: None,
            specific_location: None,
            last_updated: None,
            update_method: UpdateMethod::System,
        }
    }

    pub fn room_pointer(&self) -> Option<RoomPointer> {
        self.room_code.as_ref().map(|code| RoomPointer {
            id: self.room_id,
            code: code.clone(),
        })
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        LocationSnapshot {
            room_id: self.room_id,
            room_code: self.room_code.clone(),
            building: self.building.clone(),
            department: self.department.clone(),
            specific_location: self.specific_location.clone(),
        }
    }
}

/// Advisory marker pointing at the item's one outstanding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLocationChange {
    pub request_id: Uuid,
    pub requested_location: RequestedLocation,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub model: String,
    pub serial_number: String,
    pub asset_tag: Option<String>,
    pub rfid_tag: Option<RfidTag>,
    pub category: EquipmentCategory,
    pub manufacturer: Option<String>,
    pub status: EquipmentStatus,
    pub condition: EquipmentCondition,
    pub notes: Option<String>,
    #[serde(rename = "currentLocation")]
    pub location: EquipmentLocation,
    pub pending_location_change: Option<PendingLocationChange>,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Moves the item into `room` and returns the history entry describing
    /// the transition. The caller persists both together.
    pub fn apply_move(
        &mut self,
        room: &Room,
        reason: MovementReason,
        moved_by: Option<String>,
        detection: Option<&DetectionMeta>,
        now: DateTime<Utc>,
    ) -> MovementRecord {
        let record = MovementRecord {
            id: Uuid::new_v4(),
            equipment_id: self.id,
            from_room: self.location.room_pointer(),
            to_room: room.pointer(),
            moved_at: now,
            moved_by,
            reason,
            detected_by_rfid: detection.is_some(),
            rfid_reader_id: detection.map(|d| d.reader_id.clone()),
            notes: detection.map(|d| rfid_note(&d.reader_id)),
            detected_at: detection.and_then(|d| d.detected_at),
        };

        self.location.room_id = Some(room.id);
        self.location.room_code = Some(room.code.clone());
        self.location.building = Some(room.building.clone());
        self.location.department = Some(room.department.clone());
        self.location.last_updated = Some(now);
        self.location.update_method = if detection.is_some() {
            UpdateMethod::RfidAuto
        } else {
            UpdateMethod::Manual
        };

        if self.status == EquipmentStatus::InTransit {
            self.status = EquipmentStatus::Available;
        }
        if detection.is_some() {
            if let Some(tag) = self.rfid_tag.as_mut() {
                tag.last_detection = Some(now);
            }
        }
        self.updated_at = now;

        record
    }

    /// Overwrites the location from an approved request. No canonical room
    /// reference is kept and no history entry is produced.
    pub fn apply_approved_change(&mut self, requested: &RequestedLocation, now: DateTime<Utc>) {
        self.location.room_id = None;
        self.location.room_code = Some(requested.room.clone());
        self.location.building = Some(requested.building.clone());
        self.location.department = Some(requested.department.clone());
        self.location.specific_location = requested.specific_location.clone();
        self.location.last_updated = Some(now);
        self.location.update_method = UpdateMethod::Manual;
        self.pending_location_change = None;
        self.updated_at = now;
    }

    /// Applies a partial update. Identifiers are normalized; a new RFID tag
    /// id starts out active with no detection.
    pub fn apply_update(
        &mut self,
        update: EquipmentUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if update.is_empty() {
            return Err(DomainError::validation("No fields to update"));
        }

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("Name must be 1-100 characters"));
            }
            self.name = name.to_string();
        }
        if let Some(model) = update.model {
            let model = model.trim();
            if model.is_empty() {
                return Err(DomainError::validation("Model is required"));
            }
            self.model = model.to_string();
        }
        if let Some(serial) = update.serial_number {
            let serial = normalize_identifier(&serial);
            if serial.is_empty() {
                return Err(DomainError::validation("Serial number is required"));
            }
            self.serial_number = serial;
        }
        if let Some(asset_tag) = update.asset_tag {
            self.asset_tag = normalize_optional_identifier(Some(asset_tag.as_str()));
        }
        if let Some(tag) = update.rfid_tag {
            self.rfid_tag = match normalize_optional_identifier(Some(tag.as_str())) {
                Some(tag_id) if self.rfid_tag.as_ref().is_some_and(|t| t.tag_id == tag_id) => {
                    self.rfid_tag.take()
                }
                Some(tag_id) => Some(RfidTag {
                    tag_id,
                    status: RfidTagStatus::Active,
                    last_detection: None,
                }),
                None => None,
            };
        }
        if let Some(status) = update.rfid_tag_status {
            match self.rfid_tag.as_mut() {
                Some(tag) => tag.status = status,
                None => return Err(DomainError::validation("Equipment has no RFID tag")),
            }
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(manufacturer) = update.manufacturer {
            self.manufacturer = Some(manufacturer.trim().to_string()).filter(|m| !m.is_empty());
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(condition) = update.condition {
            self.condition = condition;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        if update.specific_location.is_some() {
            self.location.specific_location = update.specific_location;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn summary(&self) -> EquipmentSummary {
        EquipmentSummary {
            id: self.id,
            name: self.name.clone(),
            serial_number: self.serial_number.clone(),
            asset_tag: self.asset_tag.clone(),
            rfid_tag: self.rfid_tag.as_ref().map(|t| t.tag_id.clone()),
        }
    }
}

/// Compact equipment view embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSummary {
    pub id: Uuid,
    pub name: String,
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_tag: Option<String>,
}

// ============================================================================
// Commands and filters
// ============================================================================

/// Input for registering a new item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEquipment {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[validate(length(min = 1, max = 64, message = "Serial number is required"))]
    pub serial_number: String,
    #[validate(length(max = 64, message = "Asset tag too long"))]
    pub asset_tag: Option<String>,
    #[validate(length(max = 64, message = "RFID tag too long"))]
    pub rfid_tag: Option<String>,
    pub category: EquipmentCategory,
    pub manufacturer: Option<String>,
    pub condition: Option<EquipmentCondition>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    #[validate(regex(path = *ROOM_CODE_REGEX, message = "Invalid room code"))]
    pub room_code: Option<String>,
    pub specific_location: Option<String>,
}

/// Input for a status change.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: EquipmentStatus,
    pub condition: Option<EquipmentCondition>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

/// Partial update of an item's descriptive fields and identifiers. The
/// location only changes through moves and approved requests.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentUpdate {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Serial number is required"))]
    pub serial_number: Option<String>,
    /// Blank clears the asset tag.
    #[validate(length(max = 64, message = "Asset tag too long"))]
    pub asset_tag: Option<String>,
    /// A different id replaces the tag; blank removes it.
    #[validate(length(max = 64, message = "RFID tag too long"))]
    pub rfid_tag: Option<String>,
    pub rfid_tag_status: Option<RfidTagStatus>,
    pub category: Option<EquipmentCategory>,
    #[validate(length(max = 100, message = "Manufacturer too long"))]
    pub manufacturer: Option<String>,
    pub status: Option<EquipmentStatus>,
    pub condition: Option<EquipmentCondition>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    pub specific_location: Option<String>,
    /// Version the caller last read. A mismatch is a conflict.
    pub version: Option<i64>,
}

impl EquipmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.model.is_none()
            && self.serial_number.is_none()
            && self.asset_tag.is_none()
            && self.rfid_tag.is_none()
            && self.rfid_tag_status.is_none()
            && self.category.is_none()
            && self.manufacturer.is_none()
            && self.status.is_none()
            && self.condition.is_none()
            && self.notes.is_none()
            && self.specific_location.is_none()
    }
}

/// Listing filter. Only active items are listed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentFilter {
    pub category: Option<EquipmentCategory>,
    pub status: Option<EquipmentStatus>,
    pub condition: Option<EquipmentCondition>,
    pub department: Option<String>,
    /// Case-insensitive match on name, model, manufacturer, serial number
    /// or asset tag.
    pub search: Option<String>,
}

impl EquipmentFilter {
    pub fn matches(&self, equipment: &Equipment) -> bool {
        if !equipment.is_active {
            return false;
        }
        if self.category.is_some_and(|c| c != equipment.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != equipment.status) {
            return false;
        }
        if self.condition.is_some_and(|c| c != equipment.condition) {
            return false;
        }
        if let Some(department) = &self.department {
            let matches_department = equipment
                .location
                .department
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(department.trim()));
            if !matches_department {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [
                Some(equipment.name.as_str()),
                Some(equipment.model.as_str()),
                equipment.manufacturer.as_deref(),
                Some(equipment.serial_number.as_str()),
                equipment.asset_tag.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room::{RoomStatus, RoomType};

    fn room(code: &str) -> Room {
        let now = Utc::now();
        Room {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("Room {}", code),
            building: "Main".to_string(),
            department: "Physics".to_string(),
            room_type: RoomType::Lab,
            capacity: None,
            status: RoomStatus::Active,
            is_active: true,
            rfid_readers: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn equipment() -> Equipment {
        let now = Utc::now();
        Equipment {
            id: Uuid::new_v4(),
            name: "Oscilloscope".to_string(),
            model: "DS1054Z".to_string(),
            serial_number: "SN-1".to_string(),
            asset_tag: Some("AT-1".to_string()),
            rfid_tag: Some(RfidTag {
                tag_id: "TAG-1".to_string(),
                status: RfidTagStatus::Active,
                last_detection: None,
            }),
            category: EquipmentCategory::LabEquipment,
            manufacturer: Some("Rigol".to_string()),
            status: EquipmentStatus::InTransit,
            condition: EquipmentCondition::Good,
            notes: None,
            location: EquipmentLocation::unplaced(),
            pending_location_change: None,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_move_from_unplaced() {
        let mut e = equipment();
        let target = room("B");
        let now = Utc::now();
        let record = e.apply_move(&target, MovementReason::Transfer, None, None, now);

        assert!(record.from_room.is_none());
        assert_eq!(record.to_room.code, "B");
        assert!(!record.detected_by_rfid);
        assert!(record.notes.is_none());
        assert_eq!(e.location.room_code.as_deref(), Some("B"));
        assert_eq!(e.location.room_id, Some(target.id));
        assert_eq!(e.location.update_method, UpdateMethod::Manual);
        assert_eq!(e.status, EquipmentStatus::Available);
        assert!(e.rfid_tag.as_ref().unwrap().last_detection.is_none());
    }

    #[test]
    fn test_apply_move_records_previous_room() {
        let mut e = equipment();
        let a = room("A");
        let b = room("B");
        e.apply_move(&a, MovementReason::Manual, None, None, Utc::now());
        let record = e.apply_move(&b, MovementReason::Manual, Some("alice".into()), None, Utc::now());

        assert_eq!(record.from_room, Some(a.pointer()));
        assert_eq!(record.moved_by.as_deref(), Some("alice"));
    }

    #[test]
    fn test_apply_move_with_detection() {
        let mut e = equipment();
        e.status = EquipmentStatus::InUse;
        let detection = DetectionMeta {
            reader_id: "RDR-9".to_string(),
            detected_at: None,
        };
        let now = Utc::now();
        let record = e.apply_move(&room("C"), MovementReason::RfidAuto, None, Some(&detection), now);

        assert!(record.detected_by_rfid);
        assert_eq!(record.rfid_reader_id.as_deref(), Some("RDR-9"));
        assert_eq!(record.notes.as_deref(), Some("Detected by RFID reader RDR-9"));
        assert_eq!(e.location.update_method, UpdateMethod::RfidAuto);
        assert_eq!(e.rfid_tag.as_ref().unwrap().last_detection, Some(now));
        assert_eq!(e.status, EquipmentStatus::InUse);
    }

    #[test]
    fn test_apply_approved_change_clears_room_reference() {
        let mut e = equipment();
        e.apply_move(&room("A"), MovementReason::Manual, None, None, Utc::now());
        let requested = RequestedLocation {
            building: "Annex".to_string(),
            room: "C".to_string(),
            department: "Biology".to_string(),
            specific_location: Some("Shelf 2".to_string()),
        };
        e.pending_location_change = Some(PendingLocationChange {
            request_id: Uuid::new_v4(),
            requested_location: requested.clone(),
            requested_at: Utc::now(),
        });

        e.apply_approved_change(&requested, Utc::now());

        assert_eq!(e.location.room_id, None);
        assert_eq!(e.location.room_code.as_deref(), Some("C"));
        assert_eq!(e.location.building.as_deref(), Some("Annex"));
        assert_eq!(e.location.department.as_deref(), Some("Biology"));
        assert_eq!(e.location.specific_location.as_deref(), Some("Shelf 2"));
        assert_eq!(e.location.update_method, UpdateMethod::Manual);
        assert!(e.pending_location_change.is_none());
    }

    #[test]
    fn test_filter_search_and_department() {
        let mut e = equipment();
        e.apply_move(&room("A"), MovementReason::Manual, None, None, Utc::now());

        let filter = EquipmentFilter {
            search: Some("ds10".to_string()),
            department: Some("physics".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let filter = EquipmentFilter {
            category: Some(EquipmentCategory::Vehicles),
            ..Default::default()
        };
        assert!(!filter.matches(&e));

        e.is_active = false;
        assert!(!EquipmentFilter::default().matches(&e));
    }

    #[test]
    fn test_filter_condition_and_manufacturer() {
        let e = equipment();

        let filter = EquipmentFilter {
            search: Some("rigol".to_string()),
            condition: Some(EquipmentCondition::Good),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let filter = EquipmentFilter {
            condition: Some(EquipmentCondition::Poor),
            ..Default::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn test_apply_update_normalizes_and_replaces_tag() {
        let mut e = equipment();
        e.rfid_tag.as_mut().unwrap().last_detection = Some(Utc::now());

        e.apply_update(
            EquipmentUpdate {
                name: Some(" Scope 2 ".to_string()),
                asset_tag: Some("at-77".to_string()),
                rfid_tag: Some("tag-2".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(e.name, "Scope 2");
        assert_eq!(e.asset_tag.as_deref(), Some("AT-77"));
        let tag = e.rfid_tag.as_ref().unwrap();
        assert_eq!(tag.tag_id, "TAG-2");
        assert_eq!(tag.status, RfidTagStatus::Active);
        assert!(tag.last_detection.is_none());
    }

    #[test]
    fn test_apply_update_tag_status_and_removal() {
        let mut e = equipment();
        let detected = Utc::now();
        e.rfid_tag.as_mut().unwrap().last_detection = Some(detected);

        // same id keeps the tag, only the status changes
        e.apply_update(
            EquipmentUpdate {
                rfid_tag: Some("tag-1".to_string()),
                rfid_tag_status: Some(RfidTagStatus::Lost),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let tag = e.rfid_tag.as_ref().unwrap();
        assert_eq!(tag.status, RfidTagStatus::Lost);
        assert_eq!(tag.last_detection, Some(detected));

        e.apply_update(
            EquipmentUpdate {
                rfid_tag: Some("  ".to_string()),
                asset_tag: Some(String::new()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert!(e.rfid_tag.is_none());
        assert!(e.asset_tag.is_none());

        let err = e
            .apply_update(
                EquipmentUpdate {
                    rfid_tag_status: Some(RfidTagStatus::Active),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(m) if m == "Equipment has no RFID tag"));
    }

    #[test]
    fn test_apply_update_rejects_empty_and_blank() {
        let mut e = equipment();
        assert!(matches!(
            e.apply_update(EquipmentUpdate::default(), Utc::now()),
            Err(DomainError::Validation(m)) if m == "No fields to update"
        ));
        assert!(matches!(
            e.apply_update(
                EquipmentUpdate {
                    serial_number: Some("   ".to_string()),
                    ..Default::default()
                },
                Utc::now()
            ),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_new_equipment_validation() {
        let json = r#"{"name":"","model":"X","serialNumber":"s1","category":"tools","roomCode":"bad code"}"#;
        let input: NewEquipment = serde_json::from_str(json).unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("room_code"));
    }

    #[test]
    fn test_equipment_serializes_location_as_current_location() {
        let json = serde_json::to_value(equipment()).unwrap();
        assert_eq!(json["serialNumber"], "SN-1");
        assert_eq!(json["status"], "in-transit");
        assert_eq!(json["category"], "lab-equipment");
        assert!(json["currentLocation"].is_object());
        assert!(json["rfidTag"]["lastRFIDDetection"].is_null());
    }
}
