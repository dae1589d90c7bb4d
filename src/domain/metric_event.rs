use crate::domain::{AltitudeResult, LocationReading, UNKNOWN_ALTITUDE};
use uuid::Uuid;

/// Recorded for every location update. Payload `(ddbdd)`: latitude, longitude,
/// whether the altitude is known, altitude (meaningless when unknown), accuracy.
pub const USER_LOCATION_EVENT: Uuid = Uuid::from_u128(0xabe7af92_6704_4d34_93cf_8f1b46eb09b8);

/// Recorded at startup and on reload when the operator labelled the machine's
/// location. Payload `a{ss}` of the `[Label]` group.
pub const LOCATION_LABEL_EVENT: Uuid = Uuid::from_u128(0xeb0302d8_62e7_274b_365f_cd4e59103983);

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    UserLocation {
        latitude: f64,
        longitude: f64,
        has_altitude: bool,
        altitude: f64,
        accuracy: f64,
    },
    LocationLabel(Vec<(String, String)>),
}

impl Payload {
    pub fn user_location(reading: &LocationReading, altitude: AltitudeResult) -> Self {
        Payload::UserLocation {
            latitude: reading.latitude,
            longitude: reading.longitude,
            has_altitude: altitude.has_altitude(),
            altitude: altitude.altitude().unwrap_or(UNKNOWN_ALTITUDE),
            accuracy: reading.accuracy,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricEvent {
    pub event_id: Uuid,
    pub relative_timestamp: i64,
    pub is_aggregate: bool,
    pub payload: Payload,
}

impl MetricEvent {
    pub fn singular(event_id: Uuid, relative_timestamp: i64, payload: Payload) -> Self {
        MetricEvent {
            event_id,
            relative_timestamp,
            is_aggregate: false,
            payload,
        }
    }
}
