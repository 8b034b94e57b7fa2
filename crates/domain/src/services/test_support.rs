//! Fixtures shared by service tests.

use chrono::Utc;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Word;
use fake::Fake;
use uuid::Uuid;

use crate::models::equipment::{
    Equipment, EquipmentCategory, EquipmentCondition, EquipmentLocation, EquipmentStatus, RfidTag,
    RfidTagStatus,
};
use crate::models::room::{ReaderType, RfidReader, Room, RoomStatus, RoomType};

pub fn room_fixture(code: &str, readers: &[&str]) -> Room {
    let now = Utc::now();
    Room {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: format!("Room {}", code),
        building: "Main Building".to_string(),
        department: format!("Dept {}", code),
        room_type: RoomType::Lab,
        capacity: Some(20),
        status: RoomStatus::Active,
        is_active: true,
        rfid_readers: readers
            .iter()
            .map(|r| RfidReader {
                reader_id: r.to_string(),
                reader_type: ReaderType::Both,
                is_active: true,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

pub fn equipment_fixture(serial: &str, asset_tag: Option<&str>, rfid: Option<&str>) -> Equipment {
    let now = Utc::now();
    Equipment {
        id: Uuid::new_v4(),
        name: Word().fake::<String>(),
        model: format!("M-{}", (100..999).fake::<u32>()),
        serial_number: serial.to_string(),
        asset_tag: asset_tag.map(String::from),
        rfid_tag: rfid.map(|tag| RfidTag {
            tag_id: tag.to_string(),
            status: RfidTagStatus::Active,
            last_detection: None,
        }),
        category: EquipmentCategory::LabEquipment,
        manufacturer: Some(CompanyName().fake::<String>()),
        status: EquipmentStatus::Available,
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
