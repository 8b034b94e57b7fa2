//! Publishes the backlog of location change requests awaiting review.

use chrono::Utc;
use metrics::gauge;

use domain::services::LocationChangeWorkflow;

use super::scheduler::{Job, JobFrequency};

pub struct PendingRequestsJob {
    workflow: LocationChangeWorkflow,
}

impl PendingRequestsJob {
    pub fn new(workflow: LocationChangeWorkflow) -> Self {
        Self { workflow }
    }
}

#[async_trait::async_trait]
impl Job for PendingRequestsJob {
    fn name(&self) -> &'static str {
        "pending_location_changes"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(1)
    }

    async fn execute(&self) -> Result<(), String> {
        let pending = self.workflow.pending().await.map_err(|e| e.to_string())?;
        let oldest_age_secs = pending
            .iter()
            .map(|r| (Utc::now() - r.created_at).num_seconds().max(0))
            .max()
            .unwrap_or(0);

        gauge!("location_change_requests_pending").set(pending.len() as f64);
        gauge!("location_change_oldest_pending_seconds").set(oldest_age_secs as f64);
        tracing::debug!(
            pending = pending.len(),
            oldest_age_secs,
            "Pending location change backlog recorded"
        );
        Ok(())
    }
}
