//! Equipment registry: registration, lookup, listing and lifecycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use shared::pagination::PageRequest;
use shared::validation::{normalize_identifier, normalize_optional_identifier};

use crate::error::{DomainError, NotFoundKind};
use crate::models::equipment::{
    Equipment, EquipmentFilter, EquipmentLocation, EquipmentStatus, EquipmentUpdate,
    NewEquipment, RfidTag, RfidTagStatus, StatusUpdate,
};

use super::resolver::{EquipmentRef, Resolver, RoomRef};
use super::store::EquipmentStore;

#[derive(Clone)]
pub struct RegistryService {
    resolver: Resolver,
    store: Arc<dyn EquipmentStore>,
}

impl RegistryService {
    pub fn new(resolver: Resolver, store: Arc<dyn EquipmentStore>) -> Self {
        Self { resolver, store }
    }

    pub async fn register(&self, input: NewEquipment) -> Result<Equipment, DomainError> {
        input.validate()?;

        let mut location = EquipmentLocation::unplaced();
        let now = Utc::now();
        if let Some(code) = normalize_optional_identifier(input.room_code.as_deref()) {
            let room = self.resolver.room(&RoomRef::code(&code)).await?;
            location.room_id = Some(room.id);
            location.room_code = Some(room.code);
            location.building = Some(room.building);
            location.department = Some(room.department);
            location.last_updated = Some(now);
        }
        location.specific_location = input.specific_location;

        let equipment = Equipment {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            model: input.model.trim().to_string(),
            serial_number: normalize_identifier(&input.serial_number),
            asset_tag: normalize_optional_identifier(input.asset_tag.as_deref()),
            rfid_tag: normalize_optional_identifier(input.rfid_tag.as_deref()).map(|tag_id| {
                RfidTag {
                    tag_id,
                    status: RfidTagStatus::Active,
                    last_detection: None,
                }
            }),
            category: input.category,
            manufacturer: input.manufacturer,
            status: EquipmentStatus::Available,
            condition: input.condition.unwrap_or_default(),
            notes: input.notes,
            location,
            pending_location_change: None,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        if equipment.serial_number.is_empty() {
            return Err(DomainError::validation("Serial number is required"));
        }

        self.store.insert(&equipment).await?;
        info!(
            equipment_id = %equipment.id,
            serial_number = %equipment.serial_number,
            category = %equipment.category,
            "Equipment registered"
        );
        Ok(equipment)
    }

    pub async fn get(&self, reference: &EquipmentRef) -> Result<Equipment, DomainError> {
        self.resolver.equipment(reference).await
    }

    pub async fn list(
        &self,
        filter: &EquipmentFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Equipment>, i64), DomainError> {
        Ok(self.store.list(filter, page).await?)
    }

    pub async fn update_status(
        &self,
        equipment_id: Uuid,
        update: StatusUpdate,
    ) -> Result<Equipment, DomainError> {
        update.validate()?;
        let mut equipment = self.resolver.equipment(&EquipmentRef::Id(equipment_id)).await?;
        let expected_version = equipment.version;

        equipment.status = update.status;
        if let Some(condition) = update.condition {
            equipment.condition = condition;
        }
        if update.notes.is_some() {
            equipment.notes = update.notes;
        }
        equipment.updated_at = Utc::now();

        let updated = self.store.update(&equipment, expected_version).await?;
        info!(equipment_id = %equipment_id, status = %updated.status, "Equipment status updated");
        Ok(updated)
    }

    /// Partial update of descriptive fields and identifiers. Identifier
    /// clashes and a stale `version` are conflicts.
    pub async fn update(
        &self,
        equipment_id: Uuid,
        update: EquipmentUpdate,
    ) -> Result<Equipment, DomainError> {
        update.validate()?;
        let mut equipment = self.resolver.equipment(&EquipmentRef::Id(equipment_id)).await?;
        let expected_version = equipment.version;
        if let Some(version) = update.version.filter(|v| *v != expected_version) {
            return Err(DomainError::Conflict(format!(
                "Equipment is at version {}, not {}; reload and retry",
                expected_version, version
            )));
        }

        equipment.apply_update(update, Utc::now())?;

        let updated = self.store.update(&equipment, expected_version).await?;
        info!(
            equipment_id = %equipment_id,
            version = updated.version,
            rfid_tag = ?updated.rfid_tag.as_ref().map(|t| t.tag_id.as_str()),
            "Equipment updated"
        );
        Ok(updated)
    }

    /// Soft-deletes the item. History and requests are kept. An item with a
    /// pending location change request cannot be decommissioned.
    pub async fn decommission(&self, equipment_id: Uuid) -> Result<Equipment, DomainError> {
        let mut equipment = self
            .store
            .find_by_id(equipment_id, true)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Equipment, equipment_id.to_string()))?;
        let expected_version = equipment.version;
        if let Some(pending) = &equipment.pending_location_change {
            return Err(DomainError::Conflict(format!(
                "Equipment has a pending location change request ({}); review or cancel it first",
                pending.request_id
            )));
        }

        equipment.is_active = false;
        equipment.updated_at = Utc::now();

        let updated = self.store.update(&equipment, expected_version).await?;
        info!(equipment_id = %equipment_id, "Equipment decommissioned");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::{
        EquipmentCategory, EquipmentCondition, PendingLocationChange, UpdateMethod,
    };
    use crate::models::location_change::RequestedLocation;
    use crate::services::store::IdentifierKind;
    use crate::services::memory::InMemoryStore;
    use crate::services::test_support::room_fixture;

    async fn setup() -> (Arc<InMemoryStore>, RegistryService) {
        let store = Arc::new(InMemoryStore::new());
        let registry = RegistryService::new(Resolver::new(store.clone(), store.clone()), store.clone());
        (store, registry)
    }

    fn new_equipment(serial: &str) -> NewEquipment {
        NewEquipment {
            name: "Centrifuge".to_string(),
            model: "5424R".to_string(),
            serial_number: serial.to_string(),
            asset_tag: None,
            rfid_tag: None,
            category: EquipmentCategory::LabEquipment,
            manufacturer: Some("Eppendorf".to_string()),
            condition: None,
            notes: None,
            room_code: None,
            specific_location: None,
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_identifiers() {
        let (_store, registry) = setup().await;
        let mut input = new_equipment(" sn-100 ");
        input.asset_tag = Some("at-9".to_string());
        input.rfid_tag = Some("e200-01".to_string());

        let equipment = registry.register(input).await.unwrap();
        assert_eq!(equipment.serial_number, "SN-100");
        assert_eq!(equipment.asset_tag.as_deref(), Some("AT-9"));
        assert_eq!(equipment.rfid_tag.unwrap().tag_id, "E200-01");
        assert_eq!(equipment.condition, EquipmentCondition::Good);
        assert_eq!(equipment.status, EquipmentStatus::Available);
    }

    #[tokio::test]
    async fn test_register_places_in_initial_room() {
        let (store, registry) = setup().await;
        let lab = room_fixture("LAB-2", &[]);
        store.seed_room(lab.clone()).await;
        let mut input = new_equipment("SN-101");
        input.room_code = Some("lab-2".to_string());

        let equipment = registry.register(input).await.unwrap();
        assert_eq!(equipment.location.room_id, Some(lab.id));
        assert_eq!(equipment.location.department, Some(lab.department));
        assert_eq!(equipment.location.update_method, UpdateMethod::System);
        assert_eq!(store.movement_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_serial_conflicts() {
        let (_store, registry) = setup().await;
        registry.register(new_equipment("SN-102")).await.unwrap();
        let err = registry.register(new_equipment("sn-102")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let (_store, registry) = setup().await;
        let mut input = new_equipment("SN-103");
        input.name = "x".repeat(101);
        assert!(matches!(
            registry.register(input).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status() {
        let (_store, registry) = setup().await;
        let equipment = registry.register(new_equipment("SN-104")).await.unwrap();

        let updated = registry
            .update_status(
                equipment.id,
                StatusUpdate {
                    status: EquipmentStatus::Maintenance,
                    condition: Some(EquipmentCondition::Fair),
                    notes: Some("Rotor noise".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, EquipmentStatus::Maintenance);
        assert_eq!(updated.condition, EquipmentCondition::Fair);
        assert_eq!(updated.version, equipment.version + 1);
    }

    #[tokio::test]
    async fn test_decommission_hides_equipment() {
        let (store, registry) = setup().await;
        let equipment = registry.register(new_equipment("SN-105")).await.unwrap();

        registry.decommission(equipment.id).await.unwrap();

        assert!(matches!(
            registry.get(&EquipmentRef::Id(equipment.id)).await,
            Err(DomainError::NotFound(NotFoundKind::Equipment, _))
        ));
        let stored = store.find_by_id(equipment.id, true).await.unwrap().unwrap();
        assert!(!stored.is_active);

        assert!(matches!(
            registry.decommission(equipment.id).await,
            Err(DomainError::NotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let (_store, registry) = setup().await;
        for i in 0..5 {
            registry
                .register(new_equipment(&format!("SN-2{}", i)))
                .await
                .unwrap();
        }
        let mut vehicle = new_equipment("VAN-1");
        vehicle.category = EquipmentCategory::Vehicles;
        registry.register(vehicle).await.unwrap();

        let filter = EquipmentFilter {
            category: Some(EquipmentCategory::LabEquipment),
            ..Default::default()
        };
        let page = PageRequest {
            page: 1,
            per_page: 2,
        };
        let (items, total) = registry.list(&filter, &page).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_identifiers() {
        let (store, registry) = setup().await;
        let mut input = new_equipment("SN-106");
        input.rfid_tag = Some("TAG-OLD".to_string());
        let equipment = registry.register(input).await.unwrap();

        let updated = registry
            .update(
                equipment.id,
                EquipmentUpdate {
                    model: Some("5430R".to_string()),
                    manufacturer: Some("Eppendorf AG".to_string()),
                    rfid_tag: Some("tag-new".to_string()),
                    version: Some(equipment.version),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.model, "5430R");
        assert_eq!(updated.rfid_tag.as_ref().unwrap().tag_id, "TAG-NEW");
        assert_eq!(updated.version, equipment.version + 1);
        assert!(store
            .find_by_identifier(IdentifierKind::RfidTag, "TAG-OLD")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_conflicts() {
        let (_store, registry) = setup().await;
        let mut first = new_equipment("SN-107");
        first.asset_tag = Some("AT-107".to_string());
        registry.register(first).await.unwrap();
        let second = registry.register(new_equipment("SN-108")).await.unwrap();

        let duplicate = registry
            .update(
                second.id,
                EquipmentUpdate {
                    asset_tag: Some("at-107".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(duplicate, Err(DomainError::Conflict(m)) if m.contains("asset tag")));

        let stale = registry
            .update(
                second.id,
                EquipmentUpdate {
                    name: Some("Renamed".to_string()),
                    version: Some(second.version + 5),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(stale, Err(DomainError::Conflict(_))));

        let unchanged = registry.get(&EquipmentRef::Id(second.id)).await.unwrap();
        assert_eq!(unchanged.name, "Centrifuge");
        assert!(unchanged.asset_tag.is_none());
    }

    #[tokio::test]
    async fn test_lost_tag_no_longer_resolves() {
        let (_store, registry) = setup().await;
        let mut input = new_equipment("SN-109");
        input.rfid_tag = Some("TAG-109".to_string());
        let equipment = registry.register(input).await.unwrap();
        let resolver = registry.resolver.clone();
        assert!(resolver.equipment_by_tag("TAG-109").await.is_ok());

        registry
            .update(
                equipment.id,
                EquipmentUpdate {
                    rfid_tag_status: Some(RfidTagStatus::Lost),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            resolver.equipment_by_tag("TAG-109").await,
            Err(DomainError::NotFound(NotFoundKind::Tag, _))
        ));
        // serial number still resolves the item
        assert!(resolver.equipment_by_tag("SN-109").await.is_ok());
    }

    #[tokio::test]
    async fn test_decommission_refused_while_request_pending() {
        let (store, registry) = setup().await;
        let mut equipment = registry.register(new_equipment("SN-110")).await.unwrap();
        let expected_version = equipment.version;
        equipment.pending_location_change = Some(PendingLocationChange {
            request_id: Uuid::new_v4(),
            requested_location: RequestedLocation {
                building: "Annex".to_string(),
                room: "LAB-9".to_string(),
                department: "Chemistry".to_string(),
                specific_location: None,
            },
            requested_at: Utc::now(),
        });
        store.update(&equipment, expected_version).await.unwrap();

        let err = registry.decommission(equipment.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(m) if m.contains("pending location change")));
        assert!(registry.get(&EquipmentRef::Id(equipment.id)).await.is_ok());
    }
}
