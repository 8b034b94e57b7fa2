//! Asynchronous detection feed.
//!
//! Readers that stream events hand them to a bounded queue. A dispatcher
//! routes each event to one of `max_in_flight` lanes by its tag, and every
//! lane processes its events one at a time. Events for one item keep their
//! arrival order while unrelated equipment proceeds in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use domain::models::DetectionEvent;
use domain::services::DetectionIngestion;

use crate::config::DetectionConfig;
use crate::middleware::metrics::{detection_outcome_label, record_detection};

const SOURCE: &str = "feed";

/// Events buffered per lane before the dispatcher waits.
const LANE_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("detection queue is full")]
    Full,

    #[error("detection feed is shut down")]
    Closed,
}

/// Cloneable handle for submitting events to the feed.
#[derive(Debug, Clone)]
pub struct DetectionSender {
    tx: mpsc::Sender<DetectionEvent>,
}

impl DetectionSender {
    /// Queues without waiting. A full queue is reported, not awaited.
    pub fn try_enqueue(&self, event: DetectionEvent) -> Result<(), EnqueueError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct DetectionFeed;

impl DetectionFeed {
    /// Spawns the dispatcher and its lanes. It stops when `shutdown` flips to
    /// `true` or every sender is dropped; events already queued are still
    /// processed and every lane is drained before the handle completes.
    pub fn spawn(
        ingestion: DetectionIngestion,
        config: &DetectionConfig,
        shutdown: watch::Receiver<bool>,
    ) -> (DetectionSender, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let lanes = config.max_in_flight.max(1);
        let handle = tokio::spawn(run(ingestion, rx, lanes, shutdown));
        (DetectionSender { tx }, handle)
    }
}

async fn run(
    ingestion: DetectionIngestion,
    mut rx: mpsc::Receiver<DetectionEvent>,
    lanes: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let (senders, workers): (Vec<_>, Vec<_>) = (0..lanes)
        .map(|_| {
            let (tx, lane_rx) = mpsc::channel(LANE_CAPACITY);
            (tx, tokio::spawn(run_lane(ingestion.clone(), lane_rx)))
        })
        .unzip();
    info!(lanes, "Detection feed started");

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = rx.recv() => {
                let Some(event) = received else { break };
                route(&senders, event).await;
            }
        }
    }

    rx.close();
    let mut drained = 0usize;
    while let Some(event) = rx.recv().await {
        route(&senders, event).await;
        drained += 1;
    }

    // lanes exit once their queue is empty and the sender is gone
    drop(senders);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "Detection lane failed to complete");
        }
    }
    info!(drained, "Detection feed stopped");
}

async fn run_lane(ingestion: DetectionIngestion, mut rx: mpsc::Receiver<DetectionEvent>) {
    while let Some(event) = rx.recv().await {
        process(&ingestion, event).await;
    }
}

/// Lane owning `event`. Every event for one tag maps to the same lane.
fn lane_for(event: &DetectionEvent, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    event.tag_key().hash(&mut hasher);
    (hasher.finish() % lanes as u64) as usize
}

async fn route(lanes: &[mpsc::Sender<DetectionEvent>], event: DetectionEvent) {
    let lane = lane_for(&event, lanes.len());
    if lanes[lane].send(event).await.is_err() {
        warn!(lane, "Detection lane closed, event dropped");
    }
}

async fn process(ingestion: &DetectionIngestion, event: DetectionEvent) {
    let reader_id = event.reader_id.clone().unwrap_or_default();
    let tag = event.equipment_tag.clone().unwrap_or_default();

    match ingestion.handle(event).await {
        Ok(outcome) => {
            record_detection(SOURCE, detection_outcome_label(&outcome));
            if outcome.movement_recorded {
                info!(
                    equipment_id = %outcome.equipment.id,
                    room = %outcome.room.code,
                    reader_id = %outcome.reader_id,
                    "Detection moved equipment"
                );
            } else {
                debug!(
                    equipment_id = %outcome.equipment.id,
                    reader_id = %outcome.reader_id,
                    event_type = %outcome.event_type,
                    duplicate = outcome.duplicate,
                    "Detection acknowledged"
                );
            }
        }
        Err(e) => {
            record_detection(SOURCE, "failed");
            warn!(reader_id = %reader_id, tag = %tag, error = %e, "Detection event failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use domain::models::equipment::{EquipmentCategory, NewEquipment};
    use domain::models::room::{ReaderType, RfidReader, Room, RoomStatus, RoomType};
    use domain::services::{CoreServices, EquipmentRef, InMemoryStore, IngestionSettings};

    fn room(code: &str, reader: &str) -> Room {
        let now = Utc::now();
        Room {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("Room {}", code),
            building: "Main Building".to_string(),
            department: "Research".to_string(),
            room_type: RoomType::Lab,
            capacity: None,
            status: RoomStatus::Active,
            is_active: true,
            rfid_readers: vec![RfidReader {
                reader_id: reader.to_string(),
                reader_type: ReaderType::Both,
                is_active: true,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(reader: &str, tag: &str) -> DetectionEvent {
        DetectionEvent {
            reader_id: Some(reader.to_string()),
            equipment_tag: Some(tag.to_string()),
            event_type: Some("entry".to_string()),
            timestamp: None,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, CoreServices) {
        let store = Arc::new(InMemoryStore::new());
        store.seed_room(room("LAB-1", "RDR-1")).await;
        store.seed_room(room("LAB-2", "RDR-2")).await;
        let services = CoreServices::in_memory(store.clone(), IngestionSettings::default());
        services
            .registry
            .register(NewEquipment {
                name: "Oscilloscope".to_string(),
                model: "DS1054Z".to_string(),
                serial_number: "SN-FEED-1".to_string(),
                asset_tag: None,
                rfid_tag: Some("TAG-FEED-1".to_string()),
                category: EquipmentCategory::LabEquipment,
                manufacturer: None,
                condition: None,
                notes: None,
                room_code: None,
                specific_location: None,
            })
            .await
            .unwrap();
        (store, services)
    }

    fn detection_config(channel_capacity: usize) -> DetectionConfig {
        DetectionConfig {
            channel_capacity,
            max_in_flight: 2,
            ..DetectionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_queued_events_are_processed_before_stop() {
        let (store, services) = setup().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (sender, handle) =
            DetectionFeed::spawn(services.ingestion.clone(), &detection_config(8), shutdown_rx);

        sender.try_enqueue(entry("RDR-1", "TAG-FEED-1")).unwrap();
        sender.try_enqueue(entry("RDR-1", "UNKNOWN")).unwrap();
        shutdown_tx.send_replace(true);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("feed did not stop")
            .unwrap();

        assert_eq!(store.movement_count().await, 1);
        let history = services
            .movement
            .movement_history(&EquipmentRef::parse("SN-FEED-1").unwrap())
            .await
            .unwrap();
        assert!(history.movements[0].detected_by_rfid);
        assert!(sender.is_closed());
        assert_eq!(
            sender.try_enqueue(entry("RDR-1", "TAG-FEED-1")),
            Err(EnqueueError::Closed)
        );
    }

    #[test]
    fn test_lane_for_is_stable_per_tag() {
        let lanes = 4;
        let lane = lane_for(&entry("RDR-1", "TAG-FEED-1"), lanes);
        assert_eq!(lane_for(&entry("RDR-2", " tag-feed-1 "), lanes), lane);
        assert!(lane < lanes);
        assert_eq!(lane_for(&entry("RDR-1", "TAG-FEED-1"), 1), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_entries_for_one_tag_apply_in_arrival_order() {
        let (store, services) = setup().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = DetectionConfig {
            channel_capacity: 128,
            max_in_flight: 4,
            ..DetectionConfig::default()
        };
        let (sender, handle) = DetectionFeed::spawn(services.ingestion.clone(), &config, shutdown_rx);

        for _ in 0..20 {
            sender.try_enqueue(entry("RDR-1", "TAG-FEED-1")).unwrap();
            sender.try_enqueue(entry("RDR-2", "TAG-FEED-1")).unwrap();
        }
        shutdown_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("feed did not stop")
            .unwrap();

        // every entry committed, none lost to a version conflict
        assert_eq!(store.movement_count().await, 40);
        let equipment = services
            .registry
            .get(&EquipmentRef::parse("SN-FEED-1").unwrap())
            .await
            .unwrap();
        assert_eq!(equipment.location.room_code.as_deref(), Some("LAB-2"));
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        let (_store, services) = setup().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        // a current-thread runtime does not poll the worker until we yield
        let (sender, _handle) =
            DetectionFeed::spawn(services.ingestion.clone(), &detection_config(1), shutdown_rx);

        assert_eq!(sender.capacity(), 1);
        sender.try_enqueue(entry("RDR-1", "TAG-FEED-1")).unwrap();
        assert_eq!(sender.queued(), 1);
        assert_eq!(
            sender.try_enqueue(entry("RDR-1", "TAG-FEED-1")),
            Err(EnqueueError::Full)
        );
    }

    #[tokio::test]
    async fn test_dropping_senders_stops_worker() {
        let (_store, services) = setup().await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (sender, handle) =
            DetectionFeed::spawn(services.ingestion.clone(), &detection_config(4), shutdown_rx);

        drop(sender);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("feed did not stop")
            .unwrap();
    }
}
