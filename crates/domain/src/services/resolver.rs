//! Resolution of caller-supplied identifiers into equipment and rooms.

use std::sync::Arc;

use uuid::Uuid;

use shared::validation::{normalize_identifier, normalize_optional_identifier};

use crate::error::{DomainError, NotFoundKind};
use crate::models::equipment::Equipment;
use crate::models::room::Room;

use super::store::{EquipmentStore, IdentifierKind, RoomDirectory};

/// How a caller referred to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentRef {
    Id(Uuid),
    /// Serial number or asset tag, already normalized.
    Identifier(String),
}

impl EquipmentRef {
    /// A UUID string becomes `Id`, anything else a normalized identifier.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if let Ok(id) = Uuid::parse_str(trimmed) {
            return Ok(EquipmentRef::Id(id));
        }
        let identifier = normalize_identifier(trimmed);
        if identifier.is_empty() {
            return Err(DomainError::validation("Equipment identifier is required"));
        }
        Ok(EquipmentRef::Identifier(identifier))
    }

    fn describe(&self) -> String {
        match self {
            EquipmentRef::Id(id) => id.to_string(),
            EquipmentRef::Identifier(value) => value.clone(),
        }
    }
}

impl From<Uuid> for EquipmentRef {
    fn from(id: Uuid) -> Self {
        EquipmentRef::Id(id)
    }
}

/// How a caller referred to a room. The code wins when both are given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomRef {
    pub id: Option<Uuid>,
    pub code: Option<String>,
}

impl RoomRef {
    pub fn code(code: impl AsRef<str>) -> Self {
        Self {
            id: None,
            code: Some(code.as_ref().to_string()),
        }
    }

    pub fn id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            code: None,
        }
    }
}

/// Identifier resolution shared by the core services.
#[derive(Clone)]
pub struct Resolver {
    rooms: Arc<dyn RoomDirectory>,
    equipment: Arc<dyn EquipmentStore>,
}

impl Resolver {
    pub fn new(rooms: Arc<dyn RoomDirectory>, equipment: Arc<dyn EquipmentStore>) -> Self {
        Self { rooms, equipment }
    }

    /// Resolves by id, or by serial number then asset tag.
    pub async fn equipment(&self, reference: &EquipmentRef) -> Result<Equipment, DomainError> {
        let found = match reference {
            EquipmentRef::Id(id) => self.equipment.find_by_id(*id, false).await?,
            EquipmentRef::Identifier(value) => {
                self.first_match(&[IdentifierKind::SerialNumber, IdentifierKind::AssetTag], value)
                    .await?
            }
        };
        found.ok_or_else(|| DomainError::not_found(NotFoundKind::Equipment, reference.describe()))
    }

    /// Resolves a tag reported by a reader: RFID tag, then serial number,
    /// then asset tag. `tag` must already be normalized.
    pub async fn equipment_by_tag(&self, tag: &str) -> Result<Equipment, DomainError> {
        self.first_match(
            &[
                IdentifierKind::RfidTag,
                IdentifierKind::SerialNumber,
                IdentifierKind::AssetTag,
            ],
            tag,
        )
        .await?
        .ok_or_else(|| DomainError::not_found(NotFoundKind::Tag, tag))
    }

    async fn first_match(
        &self,
        order: &[IdentifierKind],
        value: &str,
    ) -> Result<Option<Equipment>, DomainError> {
        for kind in order {
            if let Some(found) = self.equipment.find_by_identifier(*kind, value).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub async fn room(&self, reference: &RoomRef) -> Result<Room, DomainError> {
        if let Some(code) = normalize_optional_identifier(reference.code.as_deref()) {
            return self
                .rooms
                .find_room_by_code(&code)
                .await?
                .ok_or_else(|| DomainError::not_found(NotFoundKind::Room, code));
        }
        match reference.id {
            Some(id) => self
                .rooms
                .find_room_by_id(id)
                .await?
                .ok_or_else(|| DomainError::not_found(NotFoundKind::Room, id.to_string())),
            None => Err(DomainError::validation(
                "Either a room id or a room code is required",
            )),
        }
    }

    /// Room by exact code or by one of its active readers.
    pub async fn room_by_reader_or_code(&self, reader_or_code: &str) -> Result<Room, DomainError> {
        let value = normalize_identifier(reader_or_code);
        self.rooms
            .find_room_by_reader_or_code(&value)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Reader, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStore;
    use crate::services::test_support::{equipment_fixture, room_fixture};

    async fn setup() -> (Arc<InMemoryStore>, Resolver) {
        let store = Arc::new(InMemoryStore::new());
        let resolver = Resolver::new(store.clone(), store.clone());
        (store, resolver)
    }

    #[test]
    fn test_equipment_ref_parse() {
        let id = Uuid::new_v4();
        assert_eq!(EquipmentRef::parse(&id.to_string()).unwrap(), EquipmentRef::Id(id));
        assert_eq!(
            EquipmentRef::parse(" sn-001 ").unwrap(),
            EquipmentRef::Identifier("SN-001".to_string())
        );
        assert!(matches!(
            EquipmentRef::parse("   "),
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_serial_lookup_is_case_insensitive() {
        let (store, resolver) = setup().await;
        let item = equipment_fixture("SN-ABC", None, None);
        store.insert(&item).await.unwrap();

        let found = resolver
            .equipment(&EquipmentRef::parse("sn-abc").unwrap())
            .await
            .unwrap();
        assert_eq!(found.id, item.id);
    }

    #[tokio::test]
    async fn test_serial_wins_over_asset_tag() {
        let (store, resolver) = setup().await;
        let by_asset = equipment_fixture("SN-1", Some("X-1"), None);
        let by_serial = equipment_fixture("X-1", None, None);
        store.insert(&by_asset).await.unwrap();
        store.insert(&by_serial).await.unwrap();

        let found = resolver
            .equipment(&EquipmentRef::Identifier("X-1".to_string()))
            .await
            .unwrap();
        assert_eq!(found.id, by_serial.id);
    }

    #[tokio::test]
    async fn test_tag_resolution_order() {
        let (store, resolver) = setup().await;
        let tagged = equipment_fixture("SN-2", None, Some("T-1"));
        let serial_match = equipment_fixture("T-1", None, None);
        store.insert(&tagged).await.unwrap();
        store.insert(&serial_match).await.unwrap();

        assert_eq!(resolver.equipment_by_tag("T-1").await.unwrap().id, tagged.id);
        assert_eq!(resolver.equipment_by_tag("SN-2").await.unwrap().id, tagged.id);
        assert!(matches!(
            resolver.equipment_by_tag("NOPE").await,
            Err(DomainError::NotFound(NotFoundKind::Tag, _))
        ));
    }

    #[tokio::test]
    async fn test_inactive_equipment_is_not_resolved() {
        let (store, resolver) = setup().await;
        let mut item = equipment_fixture("SN-3", None, None);
        item.is_active = false;
        store.insert(&item).await.unwrap();

        assert!(matches!(
            resolver.equipment(&EquipmentRef::Id(item.id)).await,
            Err(DomainError::NotFound(NotFoundKind::Equipment, _))
        ));
    }

    #[tokio::test]
    async fn test_room_code_takes_priority_over_id() {
        let (store, resolver) = setup().await;
        let a = room_fixture("A", &[]);
        let b = room_fixture("B", &[]);
        store.seed_room(a.clone()).await;
        store.seed_room(b.clone()).await;

        let room = resolver
            .room(&RoomRef {
                id: Some(a.id),
                code: Some("b".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(room.id, b.id);

        let room = resolver.room(&RoomRef::id(a.id)).await.unwrap();
        assert_eq!(room.id, a.id);
    }

    #[tokio::test]
    async fn test_room_ref_requires_id_or_code() {
        let (_store, resolver) = setup().await;
        assert!(matches!(
            resolver.room(&RoomRef::default()).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            resolver.room(&RoomRef::code("ZZ")).await,
            Err(DomainError::NotFound(NotFoundKind::Room, code)) if code == "ZZ"
        ));
    }

    #[tokio::test]
    async fn test_room_by_reader_or_code() {
        let (store, resolver) = setup().await;
        let lab = room_fixture("LAB-1", &["RDR-10"]);
        store.seed_room(lab.clone()).await;

        assert_eq!(resolver.room_by_reader_or_code("rdr-10").await.unwrap().id, lab.id);
        assert_eq!(resolver.room_by_reader_or_code("lab-1").await.unwrap().id, lab.id);
        assert!(matches!(
            resolver.room_by_reader_or_code("RDR-99").await,
            Err(DomainError::NotFound(NotFoundKind::Reader, _))
        ));
    }
}
