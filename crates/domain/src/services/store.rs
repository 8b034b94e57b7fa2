//! Store traits implemented by the persistence layer and the in-memory store.
//!
//! Every equipment write carries the version the caller read. Implementations
//! must apply the write only when the stored version still matches and must
//! bump the version by one on success.

use uuid::Uuid;

use shared::pagination::PageRequest;

use crate::error::StoreError;
use crate::models::equipment::{Equipment, EquipmentFilter, PendingLocationChange};
use crate::models::location_change::LocationChangeRequest;
use crate::models::movement::MovementRecord;
use crate::models::room::{Room, RoomFilter};

/// Which unique identifier column an equipment lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    SerialNumber,
    AssetTag,
    RfidTag,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::SerialNumber => "serial number",
            IdentifierKind::AssetTag => "asset tag",
            IdentifierKind::RfidTag => "RFID tag",
        }
    }
}

/// Read-only access to the canonical set of rooms.
#[async_trait::async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Exact match on the normalized room code. Active rooms only.
    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, StoreError>;

    async fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError>;

    /// Room whose code equals `value`, or which has an active reader with
    /// that id. Active rooms only.
    async fn find_room_by_reader_or_code(&self, value: &str) -> Result<Option<Room>, StoreError>;

    /// Active rooms matching the filter, ordered by code.
    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, StoreError>;
}

#[async_trait::async_trait]
pub trait EquipmentStore: Send + Sync {
    /// Inserts a new item. Unique identifier clashes yield `Duplicate`.
    async fn insert(&self, equipment: &Equipment) -> Result<(), StoreError>;

    /// Active items only, unless `include_inactive` is set.
    async fn find_by_id(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<Equipment>, StoreError>;

    /// Exact match on a normalized identifier. Active items only; RFID
    /// lookups also skip tags whose status is not `active`.
    async fn find_by_identifier(
        &self,
        kind: IdentifierKind,
        value: &str,
    ) -> Result<Option<Equipment>, StoreError>;

    /// Active items matching the filter, newest first, plus the total count.
    async fn list(
        &self,
        filter: &EquipmentFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Equipment>, i64), StoreError>;

    /// Writes every mutable field of `equipment`.
    async fn update(
        &self,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError>;

    /// Writes the new location and appends `record` as one atomic unit.
    async fn record_move(
        &self,
        equipment: &Equipment,
        expected_version: i64,
        record: &MovementRecord,
    ) -> Result<Equipment, StoreError>;

    /// Movement history in chronological order.
    async fn movement_history(&self, equipment_id: Uuid) -> Result<Vec<MovementRecord>, StoreError>;
}

#[async_trait::async_trait]
pub trait LocationChangeStore: Send + Sync {
    /// Inserts a pending request and sets the pending marker on its item in
    /// one unit. Fails with `PendingRequestExists` if the item already has a
    /// marker or a pending request.
    async fn create_pending(
        &self,
        request: &LocationChangeRequest,
        marker: &PendingLocationChange,
    ) -> Result<(), StoreError>;

    async fn find_request(&self, id: Uuid) -> Result<Option<LocationChangeRequest>, StoreError>;

    /// Stores the approved request and the relocated item in one unit. Fails
    /// with `RequestNotPending` if the stored request already left `pending`.
    async fn apply_approval(
        &self,
        request: &LocationChangeRequest,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError>;

    /// Stores a rejected or cancelled request and clears the item's marker
    /// if it still points at this request. A missing item is tolerated.
    async fn close_request(&self, request: &LocationChangeRequest) -> Result<(), StoreError>;

    /// Pending requests, newest first.
    async fn list_pending(&self) -> Result<Vec<LocationChangeRequest>, StoreError>;

    /// Approved requests for one item, latest effective date first.
    async fn approved_history(
        &self,
        equipment_id: Uuid,
    ) -> Result<Vec<LocationChangeRequest>, StoreError>;
}
