//! Repository implementations of the domain store traits.

pub mod equipment;
pub mod location_change;
pub mod room;

pub use equipment::EquipmentRepository;
pub use location_change::LocationChangeRepository;
pub use room::RoomRepository;
