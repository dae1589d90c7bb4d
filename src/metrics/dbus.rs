use crate::domain::{MetricEvent, Payload};
use crate::metrics::sink::{MetricsSink, SinkError};
use async_trait::async_trait;
use nix::unistd::getuid;
use std::collections::HashMap;
use tracing::{debug, instrument};
use zbus::proxy;
use zbus::zvariant::{Structure, Value};

#[proxy(
    interface = "com.endlessm.Metrics.EventRecorderServer",
    default_service = "com.endlessm.Metrics",
    default_path = "/com/endlessm/Metrics",
    gen_blocking = false
)]
trait EventRecorderServer {
    fn record_singular_event(
        &self,
        user_id: u32,
        event_id: &[u8],
        relative_timestamp: i64,
        has_payload: bool,
        payload: &Value<'_>,
    ) -> zbus::Result<()>;
}

/// Encodes a payload the way the event recorder expects it inside its `v` argument.
fn payload_value(payload: &Payload) -> Value<'static> {
    match payload {
        Payload::UserLocation {
            latitude,
            longitude,
            has_altitude,
            altitude,
            accuracy,
        } => Value::from(Structure::from((*latitude, *longitude, *has_altitude, *altitude, *accuracy))),
        Payload::LocationLabel(entries) => Value::from(entries.iter().cloned().collect::<HashMap<String, String>>()),
    }
}

/// The system-wide event recorder, `com.endlessm.Metrics`.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    proxy: EventRecorderServerProxy<'static>,
    user_id: u32,
}

impl EventRecorder {
    pub async fn new(connection: &zbus::Connection) -> zbus::Result<Self> {
        let proxy = EventRecorderServerProxy::new(connection).await?;
        Ok(EventRecorder {
            proxy,
            user_id: getuid().as_raw(),
        })
    }
}

#[async_trait]
impl MetricsSink for EventRecorder {
    #[instrument(skip_all, fields(event_id = %event.event_id))]
    async fn record_singular_event(&self, event: &MetricEvent) -> Result<(), SinkError> {
        let payload = payload_value(&event.payload);
        debug!(relative_timestamp = event.relative_timestamp, "Sending {} to the event recorder", payload);

        self.proxy
            .record_singular_event(self.user_id, event.event_id.as_bytes(), event.relative_timestamp, true, &payload)
            .await
            .map_err(|e| SinkError::SubmissionFailed {
                event_id: event.event_id,
                reason: e.to_string(),
            })
    }
}
