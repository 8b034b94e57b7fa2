//! RFID detection event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::validation::{is_blank, normalize_identifier};

use super::equipment::EquipmentSummary;
use super::movement::MovementRecord;
use super::room::RoomSummary;
use crate::error::DomainError;

/// What a reader reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionKind {
    Entry,
    Exit,
    Heartbeat,
    Unknown,
}

impl DetectionKind {
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "entry" => DetectionKind::Entry,
            "exit" => DetectionKind::Exit,
            "heartbeat" => DetectionKind::Heartbeat,
            _ => DetectionKind::Unknown,
        }
    }

    /// Only entries relocate equipment.
    pub fn triggers_move(&self) -> bool {
        matches!(self, DetectionKind::Entry)
    }
}

/// Raw detection event as received from a reader or the HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    #[validate(required(message = "readerId is required"))]
    pub reader_id: Option<String>,
    #[validate(required(message = "equipmentTag is required"))]
    pub equipment_tag: Option<String>,
    #[validate(required(message = "eventType is required"))]
    pub event_type: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A detection event with all required fields present and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDetection {
    pub reader_id: String,
    pub tag: String,
    pub event_type: String,
    pub kind: DetectionKind,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DetectionEvent {
    /// Normalized tag, used to keep events for one item in order.
    pub fn tag_key(&self) -> Option<String> {
        self.equipment_tag
            .as_deref()
            .map(normalize_identifier)
            .filter(|tag| !tag.is_empty())
    }

    /// Validates presence of the required fields and normalizes them.
    /// Reader id and tag are uppercased. The event type is only trimmed and
    /// is matched case-sensitively.
    pub fn normalize(&self) -> Result<NormalizedDetection, DomainError> {
        self.validate()?;

        let mut missing = Vec::new();
        for (name, value) in [
            ("readerId", &self.reader_id),
            ("equipmentTag", &self.equipment_tag),
            ("eventType", &self.event_type),
        ] {
            if value.as_deref().map_or(true, is_blank) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "{} must not be blank",
                missing.join(", ")
            )));
        }

        let event_type = self
            .event_type
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(NormalizedDetection {
            reader_id: normalize_identifier(self.reader_id.as_deref().unwrap_or_default()),
            tag: normalize_identifier(self.equipment_tag.as_deref().unwrap_or_default()),
            kind: DetectionKind::parse(&event_type),
            event_type,
            timestamp: self.timestamp,
        })
    }
}

/// Result of handling one detection event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutcome {
    pub equipment: EquipmentSummary,
    pub room: RoomSummary,
    pub event_type: String,
    pub reader_id: String,
    pub timestamp: DateTime<Utc>,
    pub movement_recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<MovementRecord>,
    pub duplicate: bool,
}

/// Per-event result inside a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DetectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemOutcome>,
}
