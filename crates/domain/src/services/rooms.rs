//! Room directory service.

use std::sync::Arc;

use uuid::Uuid;

use shared::validation::normalize_identifier;

use crate::error::{DomainError, NotFoundKind};
use crate::models::room::{Room, RoomFilter, RoomType};

use super::store::RoomDirectory;

#[derive(Clone)]
pub struct RoomService {
    directory: Arc<dyn RoomDirectory>,
}

impl RoomService {
    pub fn new(directory: Arc<dyn RoomDirectory>) -> Self {
        Self { directory }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Room, DomainError> {
        let code = normalize_identifier(code);
        self.directory
            .find_room_by_code(&code)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Room, code))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Room, DomainError> {
        self.directory
            .find_room_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Room, id.to_string()))
    }

    pub async fn find_by_reader_or_code(&self, value: &str) -> Result<Room, DomainError> {
        let value = normalize_identifier(value);
        self.directory
            .find_room_by_reader_or_code(&value)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Reader, value))
    }

    pub async fn list(&self) -> Result<Vec<Room>, DomainError> {
        Ok(self.directory.list_rooms(&RoomFilter::default()).await?)
    }

    pub async fn list_by_type(&self, room_type: &str) -> Result<Vec<Room>, DomainError> {
        let room_type: RoomType = room_type.parse().map_err(DomainError::Validation)?;
        let filter = RoomFilter {
            room_type: Some(room_type),
            building: None,
        };
        Ok(self.directory.list_rooms(&filter).await?)
    }

    pub async fn list_by_building(&self, building: &str) -> Result<Vec<Room>, DomainError> {
        let filter = RoomFilter {
            room_type: None,
            building: Some(building.to_string()),
        };
        Ok(self.directory.list_rooms(&filter).await?)
    }
}
