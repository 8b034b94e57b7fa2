//! Domain services for the equipment tracker.
//!
//! Services contain business logic that operates on domain models. Storage is
//! reached only through the traits in [`store`].

pub mod ingestion;
pub mod memory;
pub mod movement;
pub mod registry;
pub mod resolver;
pub mod rooms;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

pub use ingestion::{DetectionIngestion, IngestionSettings};
pub use memory::InMemoryStore;
pub use movement::{MoveCommand, MoveOutcome, MovementEngine, MovementHistory};
pub use registry::RegistryService;
pub use resolver::{EquipmentRef, Resolver, RoomRef};
pub use rooms::RoomService;
pub use store::{EquipmentStore, IdentifierKind, LocationChangeStore, RoomDirectory};
pub use workflow::{ApprovalOutcome, LocationChangeWorkflow};

/// All core services wired over one set of stores.
#[derive(Clone)]
pub struct CoreServices {
    pub rooms: RoomService,
    pub registry: RegistryService,
    pub movement: MovementEngine,
    pub workflow: LocationChangeWorkflow,
    pub ingestion: DetectionIngestion,
}

impl CoreServices {
    pub fn new(
        rooms: Arc<dyn RoomDirectory>,
        equipment: Arc<dyn EquipmentStore>,
        requests: Arc<dyn LocationChangeStore>,
        settings: IngestionSettings,
    ) -> Self {
        let resolver = Resolver::new(rooms.clone(), equipment.clone());
        let movement = MovementEngine::new(resolver.clone(), equipment.clone());
        Self {
            rooms: RoomService::new(rooms),
            registry: RegistryService::new(resolver.clone(), equipment),
            workflow: LocationChangeWorkflow::new(resolver.clone(), requests),
            ingestion: DetectionIngestion::new(resolver, movement.clone(), settings),
            movement,
        }
    }

    /// Services backed by a single in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, settings: IngestionSettings) -> Self {
        Self::new(store.clone(), store.clone(), store, settings)
    }
}
