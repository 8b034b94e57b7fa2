//! Equipment repository: version-checked equipment writes and movement history.

use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgConnection, PgPool, Postgres};
use tracing::warn;
use uuid::Uuid;

use domain::error::NotFoundKind;
use domain::models::equipment::{Equipment, EquipmentFilter};
use domain::models::movement::MovementRecord;
use domain::services::{EquipmentStore, IdentifierKind};
use domain::StoreError;
use shared::pagination::PageRequest;

use crate::entities::{EquipmentEntity, MovementRecordEntity, EQUIPMENT_COLUMNS};
use crate::error::store_error;
use crate::metrics::{record_version_conflict, QueryTimer};

type EquipmentQuery<'q> = QueryAs<'q, Postgres, EquipmentEntity, PgArguments>;

/// Binds every mutable column, in the order `$3..=$29` used by the update.
fn bind_mutable_columns<'q>(query: EquipmentQuery<'q>, e: &Equipment) -> EquipmentQuery<'q> {
    let tag = e.rfid_tag.as_ref();
    let pending = e.pending_location_change.as_ref();
    query
        .bind(e.name.clone())
        .bind(e.model.clone())
        .bind(e.serial_number.clone())
        .bind(e.asset_tag.clone())
        .bind(tag.map(|t| t.tag_id.clone()))
        .bind(tag.map(|t| t.status.as_str()))
        .bind(tag.and_then(|t| t.last_detection))
        .bind(e.category.as_str())
        .bind(e.manufacturer.clone())
        .bind(e.status.as_str())
        .bind(e.condition.as_str())
        .bind(e.notes.clone())
        .bind(e.location.room_id)
        .bind(e.location.room_code.clone())
        .bind(e.location.building.clone())
        .bind(e.location.department.clone())
        .bind(e.location.specific_location.clone())
        .bind(e.location.last_updated)
        .bind(e.location.update_method.as_str())
        .bind(pending.map(|p| p.request_id))
        .bind(pending.map(|p| p.requested_location.building.clone()))
        .bind(pending.map(|p| p.requested_location.room.clone()))
        .bind(pending.map(|p| p.requested_location.department.clone()))
        .bind(pending.and_then(|p| p.requested_location.specific_location.clone()))
        .bind(pending.map(|p| p.requested_at))
        .bind(e.is_active)
        .bind(e.updated_at)
}

/// Writes every mutable field if the stored version still equals
/// `expected_version`, bumping it by one. Runs on the caller's connection so
/// it can share a transaction.
pub(crate) async fn write_equipment(
    conn: &mut PgConnection,
    equipment: &Equipment,
    expected_version: i64,
    operation: &'static str,
) -> Result<Equipment, StoreError> {
    let sql = format!(
        r#"
        UPDATE equipment SET
            name = $3, model = $4, serial_number = $5, asset_tag = $6,
            rfid_tag_id = $7, rfid_tag_status = $8, rfid_last_detection = $9,
            category = $10, manufacturer = $11, status = $12, condition = $13, notes = $14,
            room_id = $15, room_code = $16, building = $17, department = $18,
            specific_location = $19, location_updated_at = $20, update_method = $21,
            pending_request_id = $22, pending_building = $23, pending_room = $24,
            pending_department = $25, pending_specific_location = $26,
            pending_requested_at = $27,
            is_active = $28, updated_at = $29,
            version = version + 1
        WHERE id = $1 AND version = $2
        RETURNING {}
        "#,
        EQUIPMENT_COLUMNS
    );

    let timer = QueryTimer::new("update_equipment");
    let query = sqlx::query_as::<_, EquipmentEntity>(&sql)
        .bind(equipment.id)
        .bind(expected_version);
    let result = bind_mutable_columns(query, equipment)
        .fetch_optional(&mut *conn)
        .await;
    timer.finish(&result);

    match result.map_err(store_error)? {
        Some(row) => Ok(row.into_domain()),
        None => Err(missing_or_conflict(conn, equipment.id, operation).await),
    }
}

/// Explains why a version-checked write matched no row.
pub(crate) async fn missing_or_conflict(
    conn: &mut PgConnection,
    equipment_id: Uuid,
    operation: &'static str,
) -> StoreError {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
        .bind(equipment_id)
        .fetch_one(&mut *conn)
        .await;
    match exists {
        Ok(true) => {
            record_version_conflict(operation);
            warn!(equipment_id = %equipment_id, operation, "Stale equipment version rejected");
            StoreError::VersionConflict(equipment_id)
        }
        Ok(false) => StoreError::NotFound {
            kind: NotFoundKind::Equipment,
            key: equipment_id.to_string(),
        },
        Err(e) => store_error(e),
    }
}

/// Repository for equipment rows and their movement history.
#[derive(Clone)]
pub struct EquipmentRepository {
    pool: PgPool,
}

impl EquipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl EquipmentStore for EquipmentRepository {
    async fn insert(&self, equipment: &Equipment) -> Result<(), StoreError> {
        let timer = QueryTimer::new("insert_equipment");
        let sql = format!(
            r#"
            INSERT INTO equipment (
                name, model, serial_number, asset_tag,
                rfid_tag_id, rfid_tag_status, rfid_last_detection,
                category, manufacturer, status, condition, notes,
                room_id, room_code, building, department, specific_location,
                location_updated_at, update_method,
                pending_request_id, pending_building, pending_room, pending_department,
                pending_specific_location, pending_requested_at,
                is_active, updated_at,
                id, version, created_at
            )
            VALUES (
                $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29,
                $1, $2, $30
            )
            RETURNING {}
            "#,
            EQUIPMENT_COLUMNS
        );
        let query = sqlx::query_as::<_, EquipmentEntity>(&sql)
            .bind(equipment.id)
            .bind(equipment.version);
        let result = bind_mutable_columns(query, equipment)
            .bind(equipment.created_at)
            .fetch_one(&self.pool)
            .await;
        timer.finish(&result);
        result.map(|_| ()).map_err(store_error)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<Equipment>, StoreError> {
        let timer = QueryTimer::new("find_equipment_by_id");
        let sql = format!(
            "SELECT {} FROM equipment WHERE id = $1 AND (is_active OR $2)",
            EQUIPMENT_COLUMNS
        );
        let result = sqlx::query_as::<_, EquipmentEntity>(&sql)
            .bind(id)
            .bind(include_inactive)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result.map_err(store_error)?.map(EquipmentEntity::into_domain))
    }

    async fn find_by_identifier(
        &self,
        kind: IdentifierKind,
        value: &str,
    ) -> Result<Option<Equipment>, StoreError> {
        let (predicate, query_name) = match kind {
            IdentifierKind::SerialNumber => ("serial_number = $1", "find_equipment_by_serial"),
            IdentifierKind::AssetTag => ("asset_tag = $1", "find_equipment_by_asset_tag"),
            IdentifierKind::RfidTag => (
                "rfid_tag_id = $1 AND rfid_tag_status = 'active'",
                "find_equipment_by_rfid_tag",
            ),
        };
        let timer = QueryTimer::new(query_name);
        let sql = format!(
            "SELECT {} FROM equipment WHERE {} AND is_active",
            EQUIPMENT_COLUMNS, predicate
        );
        let result = sqlx::query_as::<_, EquipmentEntity>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result.map_err(store_error)?.map(EquipmentEntity::into_domain))
    }

    async fn list(
        &self,
        filter: &EquipmentFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Equipment>, i64), StoreError> {
        const WHERE_CLAUSE: &str = r#"
            WHERE is_active
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR condition = $3)
              AND ($4::text IS NULL OR LOWER(department) = LOWER($4))
              AND ($5::text IS NULL
                   OR POSITION(LOWER($5) IN LOWER(name)) > 0
                   OR POSITION(LOWER($5) IN LOWER(model)) > 0
                   OR POSITION(LOWER($5) IN LOWER(COALESCE(manufacturer, ''))) > 0
                   OR POSITION(LOWER($5) IN LOWER(serial_number)) > 0
                   OR POSITION(LOWER($5) IN LOWER(COALESCE(asset_tag, ''))) > 0)
        "#;
        let category = filter.category.map(|c| c.as_str());
        let status = filter.status.map(|s| s.as_str());
        let condition = filter.condition.map(|c| c.as_str());
        let department = filter.department.as_deref().map(str::trim);
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let timer = QueryTimer::new("count_equipment");
        let count_sql = format!("SELECT COUNT(*) FROM equipment {}", WHERE_CLAUSE);
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(category)
            .bind(status)
            .bind(condition)
            .bind(department)
            .bind(search)
            .fetch_one(&self.pool)
            .await;
        timer.finish(&total);
        let total = total.map_err(store_error)?;

        let timer = QueryTimer::new("list_equipment");
        let sql = format!(
            "SELECT {} FROM equipment {} ORDER BY created_at DESC LIMIT $6 OFFSET $7",
            EQUIPMENT_COLUMNS, WHERE_CLAUSE
        );
        let result = sqlx::query_as::<_, EquipmentEntity>(&sql)
            .bind(category)
            .bind(status)
            .bind(condition)
            .bind(department)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await;
        timer.finish(&result);
        let items = result
            .map_err(store_error)?
            .into_iter()
            .map(EquipmentEntity::into_domain)
            .collect();
        Ok((items, total))
    }

    async fn update(
        &self,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(store_error)?;
        write_equipment(&mut conn, equipment, expected_version, "update_equipment").await
    }

    async fn record_move(
        &self,
        equipment: &Equipment,
        expected_version: i64,
        record: &MovementRecord,
    ) -> Result<Equipment, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let updated = write_equipment(&mut tx, equipment, expected_version, "record_move").await?;

        let timer = QueryTimer::new("insert_movement_record");
        let result = sqlx::query(
            r#"
            INSERT INTO movement_records (
                id, equipment_id, from_room_id, from_room_code, to_room_id, to_room_code,
                moved_at, moved_by, reason, detected_by_rfid, rfid_reader_id, notes, detected_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(record.equipment_id)
        .bind(record.from_room.as_ref().and_then(|r| r.id))
        .bind(record.from_room.as_ref().map(|r| r.code.clone()))
        .bind(record.to_room.id)
        .bind(&record.to_room.code)
        .bind(record.moved_at)
        .bind(&record.moved_by)
        .bind(record.reason.as_str())
        .bind(record.detected_by_rfid)
        .bind(&record.rfid_reader_id)
        .bind(&record.notes)
        .bind(record.detected_at)
        .execute(&mut *tx)
        .await;
        timer.finish(&result);
        result.map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(updated)
    }

    async fn movement_history(&self, equipment_id: Uuid) -> Result<Vec<MovementRecord>, StoreError> {
        let timer = QueryTimer::new("movement_history");
        let result = sqlx::query_as::<_, MovementRecordEntity>(
            r#"
            SELECT id, equipment_id, from_room_id, from_room_code, to_room_id, to_room_code,
                   moved_at, moved_by, reason, detected_by_rfid, rfid_reader_id, notes, detected_at
            FROM movement_records
            WHERE equipment_id = $1
            ORDER BY moved_at, created_at
            "#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(MovementRecord::from)
            .collect())
    }
}
