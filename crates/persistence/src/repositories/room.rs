//! Room repository: the PostgreSQL room directory.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::room::{Room, RoomFilter};
use domain::services::RoomDirectory;
use domain::StoreError;

use crate::entities::{RoomEntity, RoomReaderEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

const ROOM_COLUMNS: &str = r#"
    id, code, name, building, department, room_type, capacity, status,
    is_active, created_at, updated_at
"#;

/// Repository for room and reader lookups.
#[derive(Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads the readers of the given rooms and assembles domain rooms.
    async fn with_readers(&self, rooms: Vec<RoomEntity>) -> Result<Vec<Room>, StoreError> {
        if rooms.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rooms.iter().map(|r| r.id).collect();

        let timer = QueryTimer::new("load_room_readers");
        let result = sqlx::query_as::<_, RoomReaderEntity>(
            r#"
            SELECT reader_id, room_id, reader_type, is_active
            FROM room_readers
            WHERE room_id = ANY($1)
            ORDER BY reader_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        let readers = result.map_err(store_error)?;

        Ok(rooms
            .into_iter()
            .map(|room| {
                let own = readers
                    .iter()
                    .filter(|r| r.room_id == room.id)
                    .cloned()
                    .collect();
                room.into_domain(own)
            })
            .collect())
    }

    async fn single(&self, room: Option<RoomEntity>) -> Result<Option<Room>, StoreError> {
        match room {
            Some(room) => Ok(self.with_readers(vec![room]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl RoomDirectory for RoomRepository {
    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, StoreError> {
        let timer = QueryTimer::new("find_room_by_code");
        let sql = format!(
            "SELECT {} FROM rooms WHERE code = $1 AND is_active",
            ROOM_COLUMNS
        );
        let result = sqlx::query_as::<_, RoomEntity>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        self.single(result.map_err(store_error)?).await
    }

    async fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let timer = QueryTimer::new("find_room_by_id");
        let sql = format!(
            "SELECT {} FROM rooms WHERE id = $1 AND is_active",
            ROOM_COLUMNS
        );
        let result = sqlx::query_as::<_, RoomEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        self.single(result.map_err(store_error)?).await
    }

    async fn find_room_by_reader_or_code(&self, value: &str) -> Result<Option<Room>, StoreError> {
        let timer = QueryTimer::new("find_room_by_reader_or_code");
        // A room code match wins over a reader match.
        let sql = format!(
            r#"
            SELECT {} FROM rooms r
            WHERE r.is_active
              AND (r.code = $1 OR EXISTS (
                    SELECT 1 FROM room_readers rr
                    WHERE rr.room_id = r.id AND rr.reader_id = $1 AND rr.is_active))
            ORDER BY (r.code = $1) DESC
            LIMIT 1
            "#,
            ROOM_COLUMNS
        );
        let result = sqlx::query_as::<_, RoomEntity>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await;
        timer.finish(&result);
        self.single(result.map_err(store_error)?).await
    }

    async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<Room>, StoreError> {
        let timer = QueryTimer::new("list_rooms");
        let sql = format!(
            r#"
            SELECT {} FROM rooms
            WHERE is_active
              AND ($1::text IS NULL OR room_type = $1)
              AND ($2::text IS NULL OR POSITION(LOWER($2) IN LOWER(building)) > 0)
            ORDER BY code
            "#,
            ROOM_COLUMNS
        );
        let result = sqlx::query_as::<_, RoomEntity>(&sql)
            .bind(filter.room_type.map(|t| t.as_str()))
            .bind(filter.building.as_deref().map(str::trim))
            .fetch_all(&self.pool)
            .await;
        timer.finish(&result);
        self.with_readers(result.map_err(store_error)?).await
    }
}
