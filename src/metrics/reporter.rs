use crate::domain::{AltitudeResult, LOCATION_LABEL_EVENT, LocationReading, MetricEvent, Payload, USER_LOCATION_EVENT};
use crate::metrics::clock::Clock;
use crate::metrics::sink::{MetricsSink, SinkError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("could not read the event clock: {0}")]
    Clock(#[from] nix::Error),
    #[error(transparent)]
    SinkSubmissionFailed(#[from] SinkError),
}

/// Turns readings into singular events, one sink call per report.
#[derive(Debug, Clone)]
pub struct EventReporter {
    sink: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
}

impl EventReporter {
    pub fn new(sink: Arc<dyn MetricsSink>, clock: Arc<dyn Clock>) -> Self {
        EventReporter { sink, clock }
    }

    #[instrument(skip_all)]
    pub async fn report(&self, reading: &LocationReading, altitude: AltitudeResult) -> Result<(), ReportError> {
        self.record(USER_LOCATION_EVENT, Payload::user_location(reading, altitude)).await
    }

    #[instrument(skip_all)]
    pub async fn report_label(&self, label: Vec<(String, String)>) -> Result<(), ReportError> {
        self.record(LOCATION_LABEL_EVENT, Payload::LocationLabel(label)).await
    }

    async fn record(&self, event_id: Uuid, payload: Payload) -> Result<(), ReportError> {
        let event = MetricEvent::singular(event_id, self.clock.relative_timestamp()?, payload);
        debug!(%event_id, "📊 Recording event...");
        self.sink.record_singular_event(&event).await?;
        debug!(%event_id, "📊 Recording event... OK");

        Ok(())
    }
}
