use crate::domain::LocationReading;
use crate::geoclue::provider::{LocationProvider, LocationUpdate, ProviderError, ProviderSession};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, instrument};

/// Name this daemon identifies itself with towards the provider.
pub const DESKTOP_ID: &str = "eos-metrics-instrumentation";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Created,
    Configured,
    Started,
    Streaming,
    Stopped,
}

/// Owns one provider session from creation until [`LocationClient::stop`].
#[derive(Debug)]
pub struct LocationClient {
    session: Box<dyn ProviderSession>,
    state: SessionState,
    updates: Option<Receiver<LocationUpdate>>,
}

impl LocationClient {
    #[instrument(skip(provider))]
    pub async fn create(provider: &dyn LocationProvider, desktop_id: &str) -> Result<Self, ProviderError> {
        debug!("🛰️ Creating location session...");
        let session = provider.get_client().await?;
        session.set_desktop_id(desktop_id).await?;
        info!(session = session.id(), "🛰️ Creating location session... OK");

        Ok(LocationClient {
            session,
            state: SessionState::Created,
            updates: None,
        })
    }

    pub async fn configure(&mut self, accuracy_level: u32, distance_threshold: u32) -> Result<(), ProviderError> {
        if !matches!(self.state, SessionState::Created | SessionState::Configured) {
            return Err(ProviderError::InvalidState("the session can only be configured before it is started"));
        }

        self.session.set_requested_accuracy_level(accuracy_level).await?;
        self.session.set_distance_threshold(distance_threshold).await?;
        self.state = SessionState::Configured;

        debug!(accuracy_level, distance_threshold, "🛰️ Configured location session");
        Ok(())
    }

    /// Subscribes to update notifications, then asks the provider to start
    /// tracking. Nothing is read from the subscription until this returns.
    #[instrument(skip_all, fields(session = self.session.id()))]
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        match self.state {
            SessionState::Configured => {}
            SessionState::Created => return Err(ProviderError::InvalidState("the session must be configured before it is started")),
            _ => return Err(ProviderError::InvalidState("the session was already started")),
        }

        debug!("🛰️ Starting location session...");
        let updates = self.session.subscribe().await?;
        if let Err(e) = self.session.start().await {
            // Tears down the subscription again.
            if let Err(stop_error) = self.session.stop().await {
                debug!("Unable to stop the location session after a failed start: {}", stop_error);
            }
            return Err(e);
        }
        self.updates = Some(updates);
        self.state = SessionState::Started;
        info!("🛰️ Starting location session... OK");

        Ok(())
    }

    /// Hands out the update stream. It can be taken once.
    pub fn updates(&mut self) -> Result<Receiver<LocationUpdate>, ProviderError> {
        match (self.state, self.updates.take()) {
            (SessionState::Started, Some(updates)) => {
                self.state = SessionState::Streaming;
                Ok(updates)
            }
            (SessionState::Streaming, _) => Err(ProviderError::InvalidState("the update stream was already taken")),
            _ => Err(ProviderError::InvalidState("the session has not been started")),
        }
    }

    pub async fn resolve(&self, update: &LocationUpdate) -> Result<LocationReading, ProviderError> {
        self.session.resolve(&update.new).await
    }

    #[instrument(skip_all, fields(session = self.session.id()))]
    pub async fn stop(mut self) -> Result<(), ProviderError> {
        self.updates = None;
        let was_running = matches!(self.state, SessionState::Started | SessionState::Streaming);
        self.state = SessionState::Stopped;

        if was_running {
            self.session.stop().await?;
            info!("🛰️ Stopped location session");
        }

        Ok(())
    }
}
