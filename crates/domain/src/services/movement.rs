//! Movement engine: relocates equipment and appends movement history.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{DomainError, StoreError};
use crate::models::equipment::{Equipment, EquipmentSummary};
use crate::models::movement::{DetectionMeta, MovementReason, MovementRecord, RoomPointer};
use crate::models::room::Room;

use super::resolver::{EquipmentRef, Resolver, RoomRef};
use super::store::EquipmentStore;

/// A request to move one item.
#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub equipment: EquipmentRef,
    pub target: RoomRef,
    pub reason: MovementReason,
    pub moved_by: Option<String>,
    pub detection: Option<DetectionMeta>,
}

#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub equipment: Equipment,
    pub previous_room: Option<RoomPointer>,
    pub movement: MovementRecord,
}

/// Movement history of one item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementHistory {
    pub equipment: EquipmentSummary,
    pub movements: Vec<MovementRecord>,
    pub total: usize,
}

#[derive(Clone)]
pub struct MovementEngine {
    resolver: Resolver,
    store: Arc<dyn EquipmentStore>,
}

impl MovementEngine {
    pub fn new(resolver: Resolver, store: Arc<dyn EquipmentStore>) -> Self {
        Self { resolver, store }
    }

    pub async fn move_equipment(&self, command: MoveCommand) -> Result<MoveOutcome, DomainError> {
        let equipment = self.resolver.equipment(&command.equipment).await?;
        let room = self.resolver.room(&command.target).await?;
        self.move_resolved(
            equipment,
            &room,
            command.reason,
            command.moved_by,
            command.detection.as_ref(),
        )
        .await
    }

    /// Moves an already loaded item. The write only succeeds if the item
    /// has not changed since it was loaded.
    pub async fn move_resolved(
        &self,
        mut equipment: Equipment,
        room: &Room,
        reason: MovementReason,
        moved_by: Option<String>,
        detection: Option<&DetectionMeta>,
    ) -> Result<MoveOutcome, DomainError> {
        let expected_version = equipment.version;
        let previous_room = equipment.location.room_pointer();
        let record = equipment.apply_move(room, reason, moved_by, detection, Utc::now());

        let equipment = match self
            .store
            .record_move(&equipment, expected_version, &record)
            .await
        {
            Ok(updated) => updated,
            Err(StoreError::VersionConflict(id)) => {
                warn!(
                    equipment_id = %id,
                    expected_version,
                    target_room = %room.code,
                    "Move rejected: equipment changed concurrently"
                );
                return Err(StoreError::VersionConflict(id).into());
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            equipment_id = %equipment.id,
            from_room = previous_room.as_ref().map(|r| r.code.as_str()).unwrap_or("none"),
            to_room = %room.code,
            reason = %reason,
            rfid = detection.is_some(),
            "Equipment moved"
        );

        Ok(MoveOutcome {
            equipment,
            previous_room,
            movement: record,
        })
    }

    pub async fn movement_history(
        &self,
        reference: &EquipmentRef,
    ) -> Result<MovementHistory, DomainError> {
        let equipment = self.resolver.equipment(reference).await?;
        let movements = self.store.movement_history(equipment.id).await?;
        Ok(MovementHistory {
            equipment: equipment.summary(),
            total: movements.len(),
            movements,
        })
    }
}
