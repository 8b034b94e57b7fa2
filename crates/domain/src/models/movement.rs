//! Movement history domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why an item was moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Manual,
    RfidAuto,
    Maintenance,
    Transfer,
    Other,
}

impl MovementReason {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Manual => "manual",
            MovementReason::RfidAuto => "rfid_auto",
            MovementReason::Maintenance => "maintenance",
            MovementReason::Transfer => "transfer",
            MovementReason::Other => "other",
        }
    }

    /// Parses a caller-supplied reason. Missing or unrecognized values fall
    /// back to [`MovementReason::Manual`] instead of failing the move.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|r| r.parse().ok())
            .unwrap_or(MovementReason::Manual)
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MovementReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(MovementReason::Manual),
            "rfid_auto" => Ok(MovementReason::RfidAuto),
            "maintenance" => Ok(MovementReason::Maintenance),
            "transfer" => Ok(MovementReason::Transfer),
            "other" => Ok(MovementReason::Other),
            _ => Err(format!(
                "Invalid movement reason: {}. Must be one of: manual, rfid_auto, maintenance, transfer, other",
                s
            )),
        }
    }
}

/// Reference to a room as stored in history: the code is always kept so the
/// entry stays readable even when the room row is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPointer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub code: String,
}

/// Metadata attached to moves triggered by an RFID reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionMeta {
    pub reader_id: String,
    pub detected_at: Option<DateTime<Utc>>,
}

/// One immutable entry in an item's movement history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRecord {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub from_room: Option<RoomPointer>,
    pub to_room: RoomPointer,
    pub moved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_by: Option<String>,
    pub reason: MovementReason,
    #[serde(rename = "detectedByRFID")]
    pub detected_by_rfid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_reader_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<DateTime<Utc>>,
}

/// Note stored on moves that came from a reader.
pub fn rfid_note(reader_id: &str) -> String {
    format!("Detected by RFID reader {}", reader_id)
}
