//! Domain models for the equipment tracker.

pub mod detection;
pub mod equipment;
pub mod location_change;
pub mod movement;
pub mod room;

pub use detection::{DetectionEvent, DetectionKind, DetectionOutcome, NormalizedDetection};
pub use equipment::{Equipment, EquipmentFilter, EquipmentStatus, EquipmentSummary};
pub use location_change::{LocationChangeRequest, LocationSnapshot, RequestStatus};
pub use movement::{DetectionMeta, MovementReason, MovementRecord, RoomPointer};
pub use room::{Room, RoomFilter, RoomSummary, RoomType};
