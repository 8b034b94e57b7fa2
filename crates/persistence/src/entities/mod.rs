//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod equipment;
pub mod location_change;
pub mod movement;
pub mod room;

pub use equipment::{EquipmentEntity, EQUIPMENT_COLUMNS};
pub use location_change::{LocationChangeEntity, REQUEST_COLUMNS};
pub use movement::MovementRecordEntity;
pub use room::{RoomEntity, RoomReaderEntity};
