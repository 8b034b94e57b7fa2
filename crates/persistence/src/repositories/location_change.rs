//! Location change request repository.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use domain::error::NotFoundKind;
use domain::models::equipment::{Equipment, PendingLocationChange};
use domain::models::location_change::LocationChangeRequest;
use domain::services::LocationChangeStore;
use domain::StoreError;

use crate::entities::{LocationChangeEntity, REQUEST_COLUMNS};
use crate::error::{store_error, violated_unique_constraint, ONE_PENDING_PER_EQUIPMENT};
use crate::metrics::QueryTimer;

use super::equipment::write_equipment;

/// Stores the review outcome of a request that is still pending.
async fn store_review(
    conn: &mut PgConnection,
    request: &LocationChangeRequest,
) -> Result<(), StoreError> {
    let timer = QueryTimer::new("store_location_change_review");
    let snapshot = request.location_at_approval.as_ref();
    let result = sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE location_change_requests SET
            status = $2,
            reviewed_by_name = $3, reviewed_by_role = $4,
            review_date = $5, review_notes = $6, effective_date = $7,
            approval_room_id = $8, approval_room_code = $9, approval_building = $10,
            approval_department = $11, approval_specific_location = $12,
            updated_at = $13
        WHERE id = $1 AND status = 'pending'
        RETURNING id
        "#,
    )
    .bind(request.id)
    .bind(request.status.as_str())
    .bind(request.reviewed_by.as_ref().map(|r| r.user_name.clone()))
    .bind(request.reviewed_by.as_ref().map(|r| r.role.clone()))
    .bind(request.review_date)
    .bind(&request.review_notes)
    .bind(request.effective_date)
    .bind(snapshot.and_then(|s| s.room_id))
    .bind(snapshot.and_then(|s| s.room_code.clone()))
    .bind(snapshot.and_then(|s| s.building.clone()))
    .bind(snapshot.and_then(|s| s.department.clone()))
    .bind(snapshot.and_then(|s| s.specific_location.clone()))
    .bind(request.updated_at)
    .fetch_optional(&mut *conn)
    .await;
    timer.finish(&result);

    if result.map_err(store_error)?.is_some() {
        return Ok(());
    }
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM location_change_requests WHERE id = $1)",
    )
    .bind(request.id)
    .fetch_one(&mut *conn)
    .await
    .map_err(store_error)?;
    if exists {
        Err(StoreError::RequestNotPending(request.id))
    } else {
        Err(StoreError::NotFound {
            kind: NotFoundKind::Request,
            key: request.id.to_string(),
        })
    }
}

/// Repository for location change requests and the pending marker they own.
#[derive(Clone)]
pub struct LocationChangeRepository {
    pool: PgPool,
}

impl LocationChangeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_many(
        &self,
        query_name: &'static str,
        sql: &str,
        equipment_id: Option<Uuid>,
    ) -> Result<Vec<LocationChangeRequest>, StoreError> {
        let timer = QueryTimer::new(query_name);
        let result = sqlx::query_as::<_, LocationChangeEntity>(sql)
            .bind(equipment_id)
            .fetch_all(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(LocationChangeEntity::into_domain)
            .collect())
    }
}

#[async_trait::async_trait]
impl LocationChangeStore for LocationChangeRepository {
    async fn create_pending(
        &self,
        request: &LocationChangeRequest,
        marker: &PendingLocationChange,
    ) -> Result<(), StoreError> {
        let equipment_id = request.equipment_id;
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // The marker write only succeeds on an item without a marker; the row
        // lock makes a concurrent creation wait and then miss.
        let timer = QueryTimer::new("set_pending_marker");
        let marked = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE equipment SET
                pending_request_id = $2, pending_building = $3, pending_room = $4,
                pending_department = $5, pending_specific_location = $6,
                pending_requested_at = $7,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_active AND pending_request_id IS NULL
            RETURNING id
            "#,
        )
        .bind(equipment_id)
        .bind(marker.request_id)
        .bind(&marker.requested_location.building)
        .bind(&marker.requested_location.room)
        .bind(&marker.requested_location.department)
        .bind(&marker.requested_location.specific_location)
        .bind(marker.requested_at)
        .fetch_optional(&mut *tx)
        .await;
        timer.finish(&marked);

        if marked.map_err(store_error)?.is_none() {
            let active = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1 AND is_active)",
            )
            .bind(equipment_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;
            return Err(if active {
                StoreError::PendingRequestExists(equipment_id)
            } else {
                StoreError::NotFound {
                    kind: NotFoundKind::Equipment,
                    key: equipment_id.to_string(),
                }
            });
        }

        let timer = QueryTimer::new("insert_location_change");
        let current = &request.current_location;
        let result = sqlx::query(
            r#"
            INSERT INTO location_change_requests (
                id, equipment_id, equipment_name, equipment_serial_number, equipment_model,
                current_room_id, current_room_code, current_building, current_department,
                current_specific_location,
                requested_building, requested_room, requested_department,
                requested_specific_location,
                request_type, reason, requested_by_name, requested_by_department, priority,
                notes, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(request.id)
        .bind(equipment_id)
        .bind(&request.equipment_info.name)
        .bind(&request.equipment_info.serial_number)
        .bind(&request.equipment_info.model)
        .bind(current.room_id)
        .bind(&current.room_code)
        .bind(&current.building)
        .bind(&current.department)
        .bind(&current.specific_location)
        .bind(&request.requested_location.building)
        .bind(&request.requested_location.room)
        .bind(&request.requested_location.department)
        .bind(&request.requested_location.specific_location)
        .bind(request.request_type.as_str())
        .bind(&request.reason)
        .bind(&request.requested_by.user_name)
        .bind(&request.requested_by.department)
        .bind(request.priority.as_str())
        .bind(&request.notes)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await;
        timer.finish(&result);

        if let Err(e) = result {
            if violated_unique_constraint(&e).as_deref() == Some(ONE_PENDING_PER_EQUIPMENT) {
                return Err(StoreError::PendingRequestExists(equipment_id));
            }
            return Err(store_error(e));
        }

        tx.commit().await.map_err(store_error)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<LocationChangeRequest>, StoreError> {
        let timer = QueryTimer::new("find_location_change_by_id");
        let sql = format!(
            "SELECT {} FROM location_change_requests WHERE id = $1",
            REQUEST_COLUMNS
        );
        let result = sqlx::query_as::<_, LocationChangeEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        Ok(result
            .map_err(store_error)?
            .map(LocationChangeEntity::into_domain))
    }

    async fn apply_approval(
        &self,
        request: &LocationChangeRequest,
        equipment: &Equipment,
        expected_version: i64,
    ) -> Result<Equipment, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        store_review(&mut tx, request).await?;
        let updated = write_equipment(&mut tx, equipment, expected_version, "apply_approval").await?;
        tx.commit().await.map_err(store_error)?;
        Ok(updated)
    }

    async fn close_request(&self, request: &LocationChangeRequest) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        store_review(&mut tx, request).await?;

        // A missing item or a marker owned by another request is left alone.
        let timer = QueryTimer::new("clear_pending_marker");
        let result = sqlx::query(
            r#"
            UPDATE equipment SET
                pending_request_id = NULL, pending_building = NULL, pending_room = NULL,
                pending_department = NULL, pending_specific_location = NULL,
                pending_requested_at = NULL,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND pending_request_id = $2
            "#,
        )
        .bind(request.equipment_id)
        .bind(request.id)
        .execute(&mut *tx)
        .await;
        timer.finish(&result);
        result.map_err(store_error)?;

        tx.commit().await.map_err(store_error)
    }

    async fn list_pending(&self) -> Result<Vec<LocationChangeRequest>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM location_change_requests
            WHERE status = 'pending' AND ($1::uuid IS NULL OR equipment_id = $1)
            ORDER BY created_at DESC
            "#,
            REQUEST_COLUMNS
        );
        self.fetch_many("list_pending_location_changes", &sql, None)
            .await
    }

    async fn approved_history(
        &self,
        equipment_id: Uuid,
    ) -> Result<Vec<LocationChangeRequest>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM location_change_requests
            WHERE status = 'approved' AND equipment_id = $1
            ORDER BY effective_date DESC
            "#,
            REQUEST_COLUMNS
        );
        self.fetch_many("approved_location_change_history", &sql, Some(equipment_id))
            .await
    }
}
