//! Background jobs and the detection feed worker.

mod detection_feed;
mod pending_requests;
mod pool_metrics;
mod scheduler;

pub use detection_feed::{DetectionFeed, DetectionSender, EnqueueError};
pub use pending_requests::PendingRequestsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
