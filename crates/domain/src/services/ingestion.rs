//! Detection ingestion: turns reader events into movement engine calls.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::DomainError;
use crate::models::detection::{BatchItemOutcome, BatchOutcome, DetectionEvent, DetectionOutcome};
use crate::models::movement::{DetectionMeta, MovementReason};

use super::movement::MovementEngine;
use super::resolver::Resolver;

/// Upper bound on tracked (reader, tag) pairs in the replay window.
const REPLAY_CACHE_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestionSettings {
    /// Repeated entries for the same (reader, tag) inside this window are
    /// acknowledged without moving. Zero disables suppression.
    pub dedup_window: Duration,
}

#[derive(Clone)]
pub struct DetectionIngestion {
    resolver: Resolver,
    engine: MovementEngine,
    replay: Option<Cache<(String, String), ()>>,
}

impl DetectionIngestion {
    pub fn new(resolver: Resolver, engine: MovementEngine, settings: IngestionSettings) -> Self {
        let replay = (!settings.dedup_window.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(REPLAY_CACHE_CAPACITY)
                .time_to_live(settings.dedup_window)
                .build()
        });
        Self {
            resolver,
            engine,
            replay,
        }
    }

    pub async fn handle(&self, event: DetectionEvent) -> Result<DetectionOutcome, DomainError> {
        let detection = event.normalize()?;
        let room = self
            .resolver
            .room_by_reader_or_code(&detection.reader_id)
            .await?;
        let equipment = self.resolver.equipment_by_tag(&detection.tag).await?;
        let timestamp = detection.timestamp.unwrap_or_else(Utc::now);

        let mut outcome = DetectionOutcome {
            equipment: equipment.summary(),
            room: room.summary(),
            event_type: detection.event_type.clone(),
            reader_id: detection.reader_id.clone(),
            timestamp,
            movement_recorded: false,
            movement: None,
            duplicate: false,
        };

        if !detection.kind.triggers_move() {
            debug!(
                reader_id = %detection.reader_id,
                tag = %detection.tag,
                event_type = %detection.event_type,
                "Detection acknowledged without movement"
            );
            return Ok(outcome);
        }

        let key = (detection.reader_id.clone(), detection.tag.clone());
        if let Some(replay) = &self.replay {
            let fresh = replay.entry(key.clone()).or_insert(()).await.is_fresh();
            if !fresh {
                debug!(
                    reader_id = %detection.reader_id,
                    tag = %detection.tag,
                    "Duplicate entry inside replay window suppressed"
                );
                outcome.duplicate = true;
                return Ok(outcome);
            }
        }

        let meta = DetectionMeta {
            reader_id: detection.reader_id.clone(),
            detected_at: detection.timestamp,
        };
        match self
            .engine
            .move_resolved(equipment, &room, MovementReason::RfidAuto, None, Some(&meta))
            .await
        {
            Ok(moved) => {
                outcome.equipment = moved.equipment.summary();
                outcome.movement_recorded = true;
                outcome.movement = Some(moved.movement);
                Ok(outcome)
            }
            Err(e) => {
                // a failed move must not suppress the next attempt
                if let Some(replay) = &self.replay {
                    replay.invalidate(&key).await;
                }
                Err(e)
            }
        }
    }

    /// Handles a batch. Events for different tags run concurrently; events
    /// for the same tag run in batch order inside one task. One failure never
    /// affects the others.
    pub async fn handle_batch(&self, events: Vec<DetectionEvent>) -> BatchOutcome {
        let total = events.len();
        let mut set = JoinSet::new();
        for group in group_by_tag(events) {
            let ingestion = self.clone();
            set.spawn(async move {
                let mut results = Vec::with_capacity(group.len());
                for (index, event) in group {
                    results.push((index, ingestion.handle(event).await));
                }
                results
            });
        }

        let mut slots: Vec<Option<BatchItemOutcome>> = vec![None; total];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(results) => {
                    for (index, result) in results {
                        slots[index] = Some(match result {
                            Ok(outcome) => BatchItemOutcome {
                                index,
                                success: true,
                                outcome: Some(outcome),
                                error: None,
                            },
                            Err(e) => BatchItemOutcome {
                                index,
                                success: false,
                                outcome: None,
                                error: Some(e.to_string()),
                            },
                        });
                    }
                }
                Err(e) => warn!(error = %e, "Detection task failed to complete"),
            }
        }

        let results: Vec<BatchItemOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| BatchItemOutcome {
                    index,
                    success: false,
                    outcome: None,
                    error: Some("Detection task aborted".to_string()),
                })
            })
            .collect();
        let succeeded = results.iter().filter(|r| r.success).count();

        BatchOutcome {
            processed: total,
            succeeded,
            failed: total - succeeded,
            results,
        }
    }
}

/// Splits a batch into per-tag groups, each in arrival order. Events
/// without a usable tag form groups of one.
fn group_by_tag(events: Vec<DetectionEvent>) -> Vec<Vec<(usize, DetectionEvent)>> {
    let mut groups: Vec<Vec<(usize, DetectionEvent)>> = Vec::new();
    let mut by_tag: HashMap<String, usize> = HashMap::new();
    for (index, event) in events.into_iter().enumerate() {
        match event.tag_key() {
            Some(tag) => {
                let slot = *by_tag.entry(tag).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[slot].push((index, event));
            }
            None => groups.push(vec![(index, event)]),
        }
    }
    groups
}
