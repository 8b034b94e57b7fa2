//! In-memory store for development and testing.
//!
//! Implements every store trait over one lock, so multi-record operations
//! are atomic the same way a database transaction would make them.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use shared::pagination::PageRequest;

use crate::error::{NotFoundKind, StoreError};
use crate::models::equipment::{Equipment, EquipmentFilter, PendingLocationChange, RfidTagStatus};
use crate::models::location_change::{LocationChangeRequest, RequestStatus};
use crate::models::movement::MovementRecord;
use crate::models::room::{Room, RoomFilter};

use super::store::{EquipmentStore, IdentifierKind, LocationChangeStore, RoomDirectory};

#[derive(Debug, Default)]
struct Inner {
    rooms: HashMap<Uuid, Room>,
    equipment: HashMap<Uuid, Equipment>,
    movements: Vec<MovementRecord>,
    requests: HashMap<Uuid, LocationChangeRequest>,
}

impl Inner {
    fn check_unique(&self, candidate: &Equipment) -> Result<(), StoreError> {
        for existing in self.equipment.values().filter(|e| e.id != candidate.id) {
            if existing.serial_number == candidate.serial_number {
                return Err(StoreError::Duplicate(IdentifierKind::SerialNumber.as_str().into()));
            }
            if candidate.asset_tag.is_some() && existing.asset_tag == candidate.asset_tag {
                return Err(StoreError::Duplicate(IdentifierKind::AssetTag.as_str().into()));
            }
            if let (Some(a), Some(b)) = (&existing.rfid_tag, &candidate.rfid_tag) {
                if a.tag_id == b.tag_id {
                    return Err(StoreError::Duplicate(IdentifierKind::RfidTag.as_str().into()));
                }
            }
        }
        Ok(())
    }

    /// Replaces the stored item if `expected_version` still matches.
    fn write_equipment(
        &mut self,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError> {
        let stored = self
            .equipment
            .get(&equipment.id)
            .ok_or_else(|| StoreError::NotFound {
                kind: NotFoundKind::Equipment,
                key: equipment.id.to_string(),
            })?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict(equipment.id));
        }
        let mut updated = equipment.clone();
        updated.version = expected_version + 1;
        self.equipment.insert(updated.id, updated.clone());
        Ok(updated)
    }

    fn ensure_request_pending(&self, id: Uuid) -> Result<(), StoreError> {
        match self.requests.get(&id) {
            Some(r) if r.status == RequestStatus::Pending => Ok(()),
            Some(_) => Err(StoreError::RequestNotPending(id)),
            None => Err(StoreError::NotFound {
                kind: NotFoundKind::Request,
                key: id.to_string(),
            }),
        }
    }
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a room. Rooms are provisioned out of band.
    pub async fn seed_room(&self, room: Room) {
        self.inner.write().await.rooms.insert(room.id, room);
    }

    /// Number of movement records across all items.
    pub async fn movement_count(&self) -> usize {
        self.inner.read().await.movements.len()
    }
}

#[async_trait::async_trait]
impl RoomDirectory for InMemoryStore {
    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rooms
            .values()
            .find(|r| r.is_active && r.code == code)
            .cloned())
    }

    async fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.rooms.get(&id).filter(|r| r.is_active).cloned())
    }

    async fn find_room_by_reader_or_code(&self, value: &str) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.read().await;
        let by_code = inner.rooms.values().find(|r| r.is_active && r.code == value);
        Ok(by_code
            .or_else(|| {
                inner
                    .rooms
                    .values()
                    .find(|r| r.is_active && r.has_active_reader(value))
            })
            .cloned())
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, StoreError> {
        let inner = self.inner.read().await;
        let mut rooms: Vec<Room> = inner
            .rooms
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rooms)
    }
}

#[async_trait::async_trait]
impl EquipmentStore for InMemoryStore {
    async fn insert(&self, equipment: &Equipment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_unique(equipment)?;
        inner.equipment.insert(equipment.id, equipment.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<Equipment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .equipment
            .get(&id)
            .filter(|e| include_inactive || e.is_active)
            .cloned())
    }

    async fn find_by_identifier(
        &self,
        kind: IdentifierKind,
        value: &str,
    ) -> Result<Option<Equipment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .equipment
            .values()
            .filter(|e| e.is_active)
            .find(|e| match kind {
                IdentifierKind::SerialNumber => e.serial_number == value,
                IdentifierKind::AssetTag => e.asset_tag.as_deref() == Some(value),
                IdentifierKind::RfidTag => e
                    .rfid_tag
                    .as_ref()
                    .is_some_and(|t| t.tag_id == value && t.status == RfidTagStatus::Active),
            })
            .cloned())
    }

    async fn list(
        &self,
        filter: &EquipmentFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Equipment>, i64), StoreError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<Equipment> = inner
            .equipment
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        Ok((page.slice(&matching), total))
    }

    async fn update(
        &self,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError> {
        let mut inner = self.inner.write().await;
        inner.check_unique(equipment)?;
        inner.write_equipment(equipment, expected_version)
    }

    async fn record_move(
        &self,
        equipment: &Equipment,
        expected_version: i64,
        record: &MovementRecord,
    ) -> Result<Equipment, StoreError> {
        let mut inner = self.inner.write().await;
        let updated = inner.write_equipment(equipment, expected_version)?;
        inner.movements.push(record.clone());
        Ok(updated)
    }

    async fn movement_history(&self, equipment_id: Uuid) -> Result<Vec<MovementRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .movements
            .iter()
            .filter(|m| m.equipment_id == equipment_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl LocationChangeStore for InMemoryStore {
    async fn create_pending(
        &self,
        request: &LocationChangeRequest,
        marker: &PendingLocationChange,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let equipment_id = request.equipment_id;

        let already_pending = inner
            .requests
            .values()
            .any(|r| r.equipment_id == equipment_id && r.status == RequestStatus::Pending);
        let equipment = inner
            .equipment
            .get_mut(&equipment_id)
            .filter(|e| e.is_active)
            .ok_or_else(|| StoreError::NotFound {
                kind: NotFoundKind::Equipment,
                key: equipment_id.to_string(),
            })?;
        if already_pending || equipment.pending_location_change.is_some() {
            return Err(StoreError::PendingRequestExists(equipment_id));
        }

        equipment.pending_location_change = Some(marker.clone());
        equipment.version += 1;
        inner.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<LocationChangeRequest>, StoreError> {
        Ok(self.inner.read().await.requests.get(&id).cloned())
    }

    async fn apply_approval(
        &self,
        request: &LocationChangeRequest,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError> {
        let mut inner = self.inner.write().await;
        inner.ensure_request_pending(request.id)?;
        let updated = inner.write_equipment(equipment, expected_version)?;
        inner.requests.insert(request.id, request.clone());
        Ok(updated)
    }

    async fn close_request(&self, request: &LocationChangeRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.ensure_request_pending(request.id)?;
        if let Some(equipment) = inner.equipment.get_mut(&request.equipment_id) {
            let points_here = equipment
                .pending_location_change
                .as_ref()
                .is_some_and(|p| p.request_id == request.id);
            if points_here {
                equipment.pending_location_change = None;
                equipment.version += 1;
            }
        }
        inner.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<LocationChangeRequest>, StoreError> {
        let inner = self.inner.read().await;
        let mut pending: Vec<LocationChangeRequest> = inner
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn approved_history(
        &self,
        equipment_id: Uuid,
    ) -> Result<Vec<LocationChangeRequest>, StoreError> {
        let inner = self.inner.read().await;
        let mut approved: Vec<LocationChangeRequest> = inner
            .requests
            .values()
            .filter(|r| r.equipment_id == equipment_id && r.status == RequestStatus::Approved)
            .cloned()
            .collect();
        approved.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
        Ok(approved)
    }
}
