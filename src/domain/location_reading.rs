/// A single fix as published by the geolocation provider.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct LocationReading {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64, // In meters, raw provider value, may be the unknown sentinel
    pub accuracy: f64, // In meters
}
