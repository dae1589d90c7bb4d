/// GeoClue publishes the lowest double (-1.7976931348623157e+308) when it could not
/// determine the altitude. Peers round-tripping it through text end up with
/// -1.797693e+308, so anything at or below this bound is read as unknown.
pub const UNKNOWN_ALTITUDE: f64 = -1.797693e+308;

const UNKNOWN_ALTITUDE_BOUND: f64 = -1e308;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AltitudeResult(Option<f64>);

impl AltitudeResult {
    pub fn has_altitude(&self) -> bool {
        self.0.is_some()
    }

    pub fn altitude(&self) -> Option<f64> {
        self.0
    }
}

/// Maps a raw provider altitude onto an optional measurement. NaN is never a
/// measurement either.
pub fn interpret_altitude(raw: f64) -> AltitudeResult {
    if raw > UNKNOWN_ALTITUDE_BOUND { AltitudeResult(Some(raw)) } else { AltitudeResult(None) }
}
