use crate::domain::MetricEvent;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use uuid::Uuid;

#[async_trait]
pub trait MetricsSink: Debug + Send + Sync {
    async fn record_singular_event(&self, event: &MetricEvent) -> Result<(), SinkError>;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("metrics sink did not accept event {event_id}: {reason}")]
    SubmissionFailed { event_id: Uuid, reason: String },
}
