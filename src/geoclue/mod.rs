mod client;
mod dbus;
mod provider;
mod proxies;

pub use client::{DESKTOP_ID, LocationClient};
pub use dbus::GeoClueProvider;
pub use provider::{ACCURACY_LEVEL_CITY, LocationHandle, LocationProvider, LocationUpdate, ProviderError, ProviderSession};
