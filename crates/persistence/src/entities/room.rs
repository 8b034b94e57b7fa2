//! Room entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::room::{ReaderType, RfidReader, Room, RoomStatus, RoomType};

/// Database row mapping for the rooms table.
#[derive(Debug, Clone, FromRow)]
pub struct RoomEntity {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub building: String,
    pub department: String,
    pub room_type: String,
    pub capacity: Option<i32>,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row mapping for the room_readers table.
#[derive(Debug, Clone, FromRow)]
pub struct RoomReaderEntity {
    pub reader_id: String,
    pub room_id: Uuid,
    pub reader_type: String,
    pub is_active: bool,
}

impl From<RoomReaderEntity> for RfidReader {
    fn from(entity: RoomReaderEntity) -> Self {
        RfidReader {
            reader_id: entity.reader_id,
            reader_type: entity.reader_type.parse().unwrap_or(ReaderType::Both),
            is_active: entity.is_active,
        }
    }
}

impl RoomEntity {
    /// Builds the domain room from this row and the readers that belong to it.
    pub fn into_domain(self, readers: Vec<RoomReaderEntity>) -> Room {
        let rfid_readers = readers
            .into_iter()
            .filter(|r| r.room_id == self.id)
            .map(RfidReader::from)
            .collect();
        Room {
            id: self.id,
            code: self.code,
            name: self.name,
            building: self.building,
            department: self.department,
            room_type: self.room_type.parse().unwrap_or(RoomType::Other),
            capacity: self.capacity,
            status: self.status.parse().unwrap_or(RoomStatus::Active),
            is_active: self.is_active,
            rfid_readers,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
