use crate::app_config::AppConfig;
use crate::domain::interpret_altitude;
use crate::geoclue::{ACCURACY_LEVEL_CITY, DESKTOP_ID, LocationClient, LocationProvider, LocationUpdate, ProviderError};
use crate::metrics::EventReporter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    SessionCreated,
    Configured,
    Started,
    AwaitingUpdate,
    Reporting,
    ShutDown,
}

/// Drives the location session and reports every update it yields.
#[derive(Debug)]
pub struct LocationReportingOrchestrator {
    provider: Arc<dyn LocationProvider>,
    reporter: EventReporter,
    state: OrchestratorState,
    wanted: bool,
    distance_threshold: u32,
    retry_delay: Duration,
    retry_max_delay: Duration,
    max_attempts: usize,
}

impl LocationReportingOrchestrator {
    pub fn new(provider: Arc<dyn LocationProvider>, reporter: EventReporter, config: &AppConfig) -> Self {
        LocationReportingOrchestrator {
            provider,
            reporter,
            state: OrchestratorState::Idle,
            wanted: config.location().is_wanted(),
            distance_threshold: config.location().distance_threshold(),
            retry_delay: config.provider().retry_delay(),
            retry_max_delay: config.provider().retry_max_delay(),
            max_attempts: config.provider().max_attempts(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Runs until `shutdown` resolves or the provider fails for good. A report in
    /// progress when shutdown is requested is finished first.
    #[instrument(skip_all)]
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<(), ProviderError> {
        if !self.wanted {
            info!("📍 Not recording location as it is not required for this image");
            return Ok(());
        }

        let mut client = self.start_session().await?;
        let result = self.process_updates(&mut client, shutdown).await;

        self.transition(OrchestratorState::ShutDown);
        if let Err(e) = client.stop().await {
            warn!("⚠️ Unable to stop the location session: {}", e);
        }

        result
    }

    async fn start_session(&mut self) -> Result<LocationClient, ProviderError> {
        let strategy = ExponentialBackoff::from_millis(u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX))
            .factor(2)
            .max_delay(self.retry_max_delay)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1));

        let provider = Arc::clone(&self.provider);
        let provider = provider.as_ref();
        let mut client = RetryIf::spawn(
            strategy,
            || async move {
                LocationClient::create(provider, DESKTOP_ID).await.inspect_err(|e| {
                    warn!("⚠️ Unable to create a location session: {}", e);
                })
            },
            |e: &ProviderError| matches!(e, ProviderError::ProviderUnavailable(_)),
        )
        .await?;
        self.transition(OrchestratorState::SessionCreated);

        client.configure(ACCURACY_LEVEL_CITY, self.distance_threshold).await?;
        self.transition(OrchestratorState::Configured);

        client.start().await?;
        self.transition(OrchestratorState::Started);

        Ok(client)
    }

    async fn process_updates(&mut self, client: &mut LocationClient, shutdown: impl Future<Output = ()>) -> Result<(), ProviderError> {
        let mut updates = client.updates()?;
        self.transition(OrchestratorState::AwaitingUpdate);
        tokio::pin!(shutdown);

        loop {
            let update = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("📍 Stopping location reporting");
                    return Ok(());
                }
                update = updates.recv() => update.ok_or(ProviderError::SubscriptionClosed)?,
            };

            self.transition(OrchestratorState::Reporting);
            self.report_update(client, update).await;
            self.transition(OrchestratorState::AwaitingUpdate);
        }
    }

    async fn report_update(&self, client: &LocationClient, update: LocationUpdate) {
        let reading = match client.resolve(&update).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(path = %update.new, "⚠️ Dropping location update: {}", e);
                return;
            }
        };

        let altitude = interpret_altitude(reading.altitude);
        debug!(old = %update.old, path = %update.new, latitude = reading.latitude, longitude = reading.longitude, altitude = ?altitude.altitude(), accuracy = reading.accuracy, "📍 Received location update");

        match self.reporter.report(&reading, altitude).await {
            Ok(()) => info!(accuracy = reading.accuracy, "📍 Recorded user location"),
            Err(e) => warn!("⚠️ Unable to record user location: {}", e),
        }
    }

    fn transition(&mut self, next: OrchestratorState) {
        debug!(from = ?self.state, to = ?next, "🔀 Location reporting state changed");
        self.state = next;
    }
}
