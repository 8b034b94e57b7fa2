//! Movement record entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::movement::{MovementReason, MovementRecord, RoomPointer};

/// Database row mapping for the movement_records table.
#[derive(Debug, Clone, FromRow)]
pub struct MovementRecordEntity {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub from_room_id: Option<Uuid>,
    pub from_room_code: Option<String>,
    pub to_room_id: Option<Uuid>,
    pub to_room_code: String,
    pub moved_at: DateTime<Utc>,
    pub moved_by: Option<String>,
    pub reason: String,
    pub detected_by_rfid: bool,
    pub rfid_reader_id: Option<String>,
    pub notes: Option<String>,
    pub detected_at: Option<DateTime<Utc>>,
}

impl From<MovementRecordEntity> for MovementRecord {
    fn from(entity: MovementRecordEntity) -> Self {
        MovementRecord {
            id: entity.id,
            equipment_id: entity.equipment_id,
            from_room: entity.from_room_code.map(|code| RoomPointer {
                id: entity.from_room_id,
                code,
            }),
            to_room: RoomPointer {
                id: entity.to_room_id,
                code: entity.to_room_code,
            },
            moved_at: entity.moved_at,
            moved_by: entity.moved_by,
            reason: MovementReason::parse_lenient(Some(&entity.reason)),
            detected_by_rfid: entity.detected_by_rfid,
            rfid_reader_id: entity.rfid_reader_id,
            notes: entity.notes,
            detected_at: entity.detected_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_move_has_no_origin() {
        let entity = MovementRecordEntity {
            id: Uuid::new_v4(),
            equipment_id: Uuid::new_v4(),
            from_room_id: Some(Uuid::new_v4()),
            from_room_code: None,
            to_room_id: None,
            to_room_code: "LAB-2".to_string(),
            moved_at: Utc::now(),
            moved_by: None,
            reason: "rfid_auto".to_string(),
            detected_by_rfid: true,
            rfid_reader_id: Some("RDR-2".to_string()),
            notes: None,
            detected_at: None,
        };

        let record = MovementRecord::from(entity);
        assert!(record.from_room.is_none());
        assert_eq!(record.to_room.code, "LAB-2");
        assert_eq!(record.reason, MovementReason::RfidAuto);
    }
}
