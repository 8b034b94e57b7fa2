//! Room domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::movement::RoomPointer;

/// Kind of physical space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomType {
    Lab,
    Office,
    MeetingRoom,
    Classroom,
    Other,
}

impl RoomType {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Lab => "lab",
            RoomType::Office => "office",
            RoomType::MeetingRoom => "meeting-room",
            RoomType::Classroom => "classroom",
            RoomType::Other => "other",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lab" => Ok(RoomType::Lab),
            "office" => Ok(RoomType::Office),
            "meeting-room" => Ok(RoomType::MeetingRoom),
            "classroom" => Ok(RoomType::Classroom),
            "other" => Ok(RoomType::Other),
            _ => Err(format!(
                "Invalid room type: {}. Must be one of: lab, office, meeting-room, classroom, other",
                s
            )),
        }
    }
}

/// Operational status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Active,
    Maintenance,
    Closed,
    Reserved,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Active => "active",
            RoomStatus::Maintenance => "maintenance",
            RoomStatus::Closed => "closed",
            RoomStatus::Reserved => "reserved",
        }
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RoomStatus::Active),
            "maintenance" => Ok(RoomStatus::Maintenance),
            "closed" => Ok(RoomStatus::Closed),
            "reserved" => Ok(RoomStatus::Reserved),
            _ => Err(format!("Invalid room status: {}", s)),
        }
    }
}

/// Direction an RFID reader watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderType {
    Entrance,
    Exit,
    Both,
}

impl ReaderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderType::Entrance => "entrance",
            ReaderType::Exit => "exit",
            ReaderType::Both => "both",
        }
    }
}

impl std::str::FromStr for ReaderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrance" => Ok(ReaderType::Entrance),
            "exit" => Ok(ReaderType::Exit),
            "both" => Ok(ReaderType::Both),
            _ => Err(format!("Invalid reader type: {}", s)),
        }
    }
}

/// An RFID reader installed in a room. Reader ids are globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidReader {
    pub reader_id: String,
    pub reader_type: ReaderType,
    pub is_active: bool,
}

/// A named physical space keyed by its code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub building: String,
    pub department: String,
    pub room_type: RoomType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    pub status: RoomStatus,
    pub is_active: bool,
    pub rfid_readers: Vec<RfidReader>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn pointer(&self) -> RoomPointer {
        RoomPointer {
            id: Some(self.id),
            code: self.code.clone(),
        }
    }

    /// Whether an active reader with the given (normalized) id belongs to this room.
    pub fn has_active_reader(&self, reader_id: &str) -> bool {
        self.rfid_readers
            .iter()
            .any(|r| r.is_active && r.reader_id == reader_id)
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            building: self.building.clone(),
            department: self.department.clone(),
        }
    }
}

/// Compact room view embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub building: String,
    pub department: String,
}

/// Filter for room listings. Only active rooms are ever listed.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub room_type: Option<RoomType>,
    /// Case-insensitive substring of the building name.
    pub building: Option<String>,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        if !room.is_active {
            return false;
        }
        if let Some(room_type) = self.room_type {
            if room.room_type != room_type {
                return false;
            }
        }
        if let Some(building) = &self.building {
            if !room
                .building
                .to_lowercase()
                .contains(&building.trim().to_lowercase())
            {
                return false;
            }
        }
        true
    }
}
