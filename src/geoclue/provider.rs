use crate::domain::LocationReading;
use async_trait::async_trait;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;
use tokio::sync::mpsc::Receiver;

/// Requested accuracy tier, GeoClue's `GCLUE_ACCURACY_LEVEL_CITY`.
pub const ACCURACY_LEVEL_CITY: u32 = 4;

/// Opaque reference to a location object owned by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocationHandle(String);

impl LocationHandle {
    pub fn new(path: impl Into<String>) -> Self {
        LocationHandle(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LocationHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocationUpdate {
    pub old: LocationHandle,
    pub new: LocationHandle,
}

#[async_trait]
pub trait LocationProvider: Debug + Send + Sync {
    /// Gets or creates the client session for this process.
    async fn get_client(&self) -> Result<Box<dyn ProviderSession>, ProviderError>;
}

#[async_trait]
pub trait ProviderSession: Debug + Send + Sync {
    fn id(&self) -> &str;

    async fn set_desktop_id(&self, desktop_id: &str) -> Result<(), ProviderError>;

    async fn set_requested_accuracy_level(&self, level: u32) -> Result<(), ProviderError>;

    async fn set_distance_threshold(&self, meters: u32) -> Result<(), ProviderError>;

    /// Update notifications in emission order. The sender side is dropped once the
    /// provider stops emitting.
    async fn subscribe(&self) -> Result<Receiver<LocationUpdate>, ProviderError>;

    async fn start(&self) -> Result<(), ProviderError>;

    async fn stop(&self) -> Result<(), ProviderError>;

    async fn resolve(&self, location: &LocationHandle) -> Result<LocationReading, ProviderError>;
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("location provider is unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("location provider rejected {request}: {reason}")]
    ProviderRejected { request: &'static str, reason: String },
    #[error("invalid location session state: {0}")]
    InvalidState(&'static str),
    #[error("could not resolve location '{path}': {reason}")]
    UnresolvedLocationReference { path: LocationHandle, reason: String },
    #[error("location update subscription closed")]
    SubscriptionClosed,
}
