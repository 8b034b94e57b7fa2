//! Location change request domain models for the approval workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::validation::ROOM_CODE_REGEX;

use crate::error::DomainError;

/// Reviewer name used when none is supplied.
pub const DEFAULT_REVIEWER: &str = "Admin";
/// Role stamped on approvals and rejections.
pub const REVIEWER_ROLE: &str = "Administrator";
/// Role stamped on cancellations.
pub const CANCELLER_ROLE: &str = "Requester";
pub const DEFAULT_REQUESTER: &str = "System";
pub const DEFAULT_REQUESTER_DEPARTMENT: &str = "Unspecified";

/// Status of a location change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[default]
    Transfer,
    Repair,
    Maintenance,
    Inventory,
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Transfer => "transfer",
            RequestType::Repair => "repair",
            RequestType::Maintenance => "maintenance",
            RequestType::Inventory => "inventory",
            RequestType::Other => "other",
        }
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(RequestType::Transfer),
            "repair" => Ok(RequestType::Repair),
            "maintenance" => Ok(RequestType::Maintenance),
            "inventory" => Ok(RequestType::Inventory),
            "other" => Ok(RequestType::Other),
            _ => Err(format!("Invalid request type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl RequestPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPriority::Low => "low",
            RequestPriority::Medium => "medium",
            RequestPriority::High => "high",
            RequestPriority::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for RequestPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RequestPriority::Low),
            "medium" => Ok(RequestPriority::Medium),
            "high" => Ok(RequestPriority::High),
            "urgent" => Ok(RequestPriority::Urgent),
            _ => Err(format!("Invalid request priority: {}", s)),
        }
    }
}

/// Equipment identity copied onto the request when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentInfo {
    pub name: String,
    pub serial_number: String,
    pub model: String,
}

/// Point-in-time copy of an item's location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LocationSnapshot {
    pub room_id: Option<Uuid>,
    pub room_code: Option<String>,
    pub building: Option<String>,
    pub department: Option<String>,
    pub specific_location: Option<String>,
}

/// Target of a request. `room` holds the room code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedLocation {
    pub building: String,
    pub room: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub user_name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub user_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationChangeRequest {
    pub id: Uuid,
    #[serde(rename = "equipment")]
    pub equipment_id: Uuid,
    pub equipment_info: EquipmentInfo,
    pub current_location: LocationSnapshot,
    pub requested_location: RequestedLocation,
    pub request_type: RequestType,
    pub reason: String,
    pub requested_by: Requester,
    pub priority: RequestPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<Reviewer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_at_approval: Option<LocationSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocationChangeRequest {
    /// Fails with a conflict describing the terminal state when the request
    /// has already left `pending`.
    pub fn ensure_pending(&self) -> Result<(), DomainError> {
        let message = match self.status {
            RequestStatus::Pending => return Ok(()),
            RequestStatus::Approved => "This request has already been approved",
            RequestStatus::Rejected => "This request has already been rejected",
            RequestStatus::Cancelled => "This request has already been cancelled",
        };
        Err(DomainError::Conflict(message.to_string()))
    }

    /// Marks the request approved. `actual` is the item's location at the
    /// moment of approval.
    pub fn approve(
        &mut self,
        reviewer: Reviewer,
        notes: Option<String>,
        actual: LocationSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = RequestStatus::Approved;
        self.reviewed_by = Some(reviewer);
        self.review_date = Some(now);
        self.review_notes = notes;
        self.effective_date = Some(now);
        self.location_at_approval = Some(actual);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(
        &mut self,
        reviewer: Reviewer,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = RequestStatus::Rejected;
        self.reviewed_by = Some(reviewer);
        self.review_date = Some(now);
        self.review_notes = notes;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(
        &mut self,
        cancelled_by: Reviewer,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_pending()?;
        self.status = RequestStatus::Cancelled;
        self.reviewed_by = Some(cancelled_by);
        self.review_date = Some(now);
        self.review_notes = notes;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the item moved between request creation and `actual`.
    pub fn location_drifted(&self, actual: &LocationSnapshot) -> bool {
        self.current_location.room_code != actual.room_code
            || self.current_location.building != actual.building
            || self.current_location.department != actual.department
    }
}

// ============================================================================
// Commands
// ============================================================================

fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    shared::validation::validate_reason(reason)
}

/// Input for creating a location change request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLocationChange {
    pub equipment_id: Uuid,
    /// Code of the target room.
    #[validate(regex(path = *ROOM_CODE_REGEX, message = "Invalid room code"))]
    pub requested_room: String,
    #[serde(default)]
    #[validate(custom(function = "validate_reason"))]
    pub reason: String,
    #[serde(default)]
    pub request_type: RequestType,
    /// Name of the requester.
    pub requested_by: Option<String>,
    /// Department of the requester.
    pub department: Option<String>,
    #[serde(default)]
    pub priority: RequestPriority,
    #[validate(length(max = 200, message = "Specific location too long"))]
    pub specific_location: Option<String>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

impl NewLocationChange {
    pub fn requester(&self) -> Requester {
        Requester {
            user_name: non_blank_or(self.requested_by.as_deref(), DEFAULT_REQUESTER),
            department: non_blank_or(self.department.as_deref(), DEFAULT_REQUESTER_DEPARTMENT),
        }
    }
}

/// Body of approve / reject / cancel calls.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    #[validate(length(max = 100, message = "Reviewer name too long"))]
    pub reviewed_by: Option<String>,
    #[validate(length(max = 1000, message = "Review notes cannot exceed 1000 characters"))]
    pub review_notes: Option<String>,
}

impl ReviewInput {
    pub fn reviewer_name(&self) -> String {
        non_blank_or(self.reviewed_by.as_deref(), DEFAULT_REVIEWER)
    }
}

fn non_blank_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}
