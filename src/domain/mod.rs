mod altitude;
mod location_reading;
mod metric_event;

pub use altitude::{AltitudeResult, UNKNOWN_ALTITUDE, interpret_altitude};
pub use location_reading::LocationReading;
pub use metric_event::{LOCATION_LABEL_EVENT, MetricEvent, Payload, USER_LOCATION_EVENT};
