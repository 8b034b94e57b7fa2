//! Location change workflow: request, approve, reject and cancel.
//!
//! Approval overwrites the item's location directly from the request. It
//! does not go through the movement engine, so no history entry is written.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{DomainError, NotFoundKind};
use crate::models::equipment::{Equipment, PendingLocationChange};
use crate::models::location_change::{
    EquipmentInfo, LocationChangeRequest, NewLocationChange, RequestStatus, RequestedLocation,
    ReviewInput, Reviewer, CANCELLER_ROLE, DEFAULT_REQUESTER, REVIEWER_ROLE,
};

use super::resolver::{EquipmentRef, Resolver, RoomRef};
use super::store::LocationChangeStore;

/// Result of a successful approval.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub request: LocationChangeRequest,
    pub equipment: Equipment,
    /// The item moved between request creation and approval.
    pub location_drifted: bool,
}

#[derive(Clone)]
pub struct LocationChangeWorkflow {
    resolver: Resolver,
    requests: Arc<dyn LocationChangeStore>,
}

impl LocationChangeWorkflow {
    pub fn new(resolver: Resolver, requests: Arc<dyn LocationChangeStore>) -> Self {
        Self { resolver, requests }
    }

    pub async fn create(&self, input: NewLocationChange) -> Result<LocationChangeRequest, DomainError> {
        input.validate()?;

        let equipment = self
            .resolver
            .equipment(&EquipmentRef::Id(input.equipment_id))
            .await?;
        if equipment.pending_location_change.is_some() {
            return Err(DomainError::Conflict(
                "A location change request is already pending for this equipment".to_string(),
            ));
        }
        let room = self.resolver.room(&RoomRef::code(&input.requested_room)).await?;

        let now = Utc::now();
        let requested_location = RequestedLocation {
            building: room.building.clone(),
            room: room.code.clone(),
            department: room.department.clone(),
            specific_location: input.specific_location.clone(),
        };
        let request = LocationChangeRequest {
            id: Uuid::new_v4(),
            equipment_id: equipment.id,
            equipment_info: EquipmentInfo {
                name: equipment.name.clone(),
                serial_number: equipment.serial_number.clone(),
                model: equipment.model.clone(),
            },
            current_location: equipment.location.snapshot(),
            requested_location: requested_location.clone(),
            request_type: input.request_type,
            reason: input.reason.trim().to_string(),
            requested_by: input.requester(),
            priority: input.priority,
            notes: input.notes.clone(),
            status: RequestStatus::Pending,
            reviewed_by: None,
            review_date: None,
            review_notes: None,
            effective_date: None,
            location_at_approval: None,
            created_at: now,
            updated_at: now,
        };
        let marker = PendingLocationChange {
            request_id: request.id,
            requested_location,
            requested_at: now,
        };

        self.requests.create_pending(&request, &marker).await?;
        info!(
            request_id = %request.id,
            equipment_id = %equipment.id,
            requested_room = %room.code,
            request_type = request.request_type.as_str(),
            "Location change requested"
        );
        Ok(request)
    }

    pub async fn approve(
        &self,
        request_id: Uuid,
        review: ReviewInput,
    ) -> Result<ApprovalOutcome, DomainError> {
        review.validate()?;
        let mut request = self.get(request_id).await?;
        request.ensure_pending()?;

        let mut equipment = self
            .resolver
            .equipment(&EquipmentRef::Id(request.equipment_id))
            .await?;
        let actual = equipment.location.snapshot();
        let location_drifted = request.location_drifted(&actual);
        if location_drifted {
            warn!(
                request_id = %request_id,
                equipment_id = %equipment.id,
                requested_from = request.current_location.room_code.as_deref().unwrap_or("none"),
                actual_room = actual.room_code.as_deref().unwrap_or("none"),
                "Equipment moved while request was pending; applying approval anyway"
            );
        }

        let now = Utc::now();
        let reviewer = Reviewer {
            user_name: review.reviewer_name(),
            role: REVIEWER_ROLE.to_string(),
        };
        request.approve(reviewer, review.review_notes, actual, now)?;

        let expected_version = equipment.version;
        equipment.apply_approved_change(&request.requested_location, now);
        let equipment = self
            .requests
            .apply_approval(&request, &equipment, expected_version)
            .await?;

        info!(
            request_id = %request_id,
            equipment_id = %equipment.id,
            room = %request.requested_location.room,
            "Location change approved"
        );
        Ok(ApprovalOutcome {
            request,
            equipment,
            location_drifted,
        })
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        review: ReviewInput,
    ) -> Result<LocationChangeRequest, DomainError> {
        review.validate()?;
        let mut request = self.get(request_id).await?;
        let reviewer = Reviewer {
            user_name: review.reviewer_name(),
            role: REVIEWER_ROLE.to_string(),
        };
        request.reject(reviewer, review.review_notes, Utc::now())?;
        self.requests.close_request(&request).await?;

        info!(request_id = %request_id, equipment_id = %request.equipment_id, "Location change rejected");
        Ok(request)
    }

    pub async fn cancel(
        &self,
        request_id: Uuid,
        review: ReviewInput,
    ) -> Result<LocationChangeRequest, DomainError> {
        review.validate()?;
        let mut request = self.get(request_id).await?;
        let cancelled_by = Reviewer {
            user_name: review
                .reviewed_by
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_REQUESTER)
                .to_string(),
            role: CANCELLER_ROLE.to_string(),
        };
        request.cancel(cancelled_by, review.review_notes, Utc::now())?;
        self.requests.close_request(&request).await?;

        info!(request_id = %request_id, equipment_id = %request.equipment_id, "Location change cancelled");
        Ok(request)
    }

    /// Approved requests for one item, latest effective date first.
    pub async fn history(&self, equipment_id: Uuid) -> Result<Vec<LocationChangeRequest>, DomainError> {
        Ok(self.requests.approved_history(equipment_id).await?)
    }

    pub async fn pending(&self) -> Result<Vec<LocationChangeRequest>, DomainError> {
        Ok(self.requests.list_pending().await?)
    }

    pub async fn get(&self, request_id: Uuid) -> Result<LocationChangeRequest, DomainError> {
        self.requests
            .find_request(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Request, request_id.to_string()))
    }
}
