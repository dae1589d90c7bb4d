use crate::app_config::AppConfig;
use crate::geoclue::GeoClueProvider;
use crate::metrics::{BootClock, EventRecorder, EventReporter, watch_location_label};
use crate::orchestrator::LocationReportingOrchestrator;
use crate::shutdown::Shutdown;
use std::sync::Arc;
use tokio::task;
use tracing::info;

mod app_config;
mod domain;
mod geoclue;
mod metrics;
mod orchestrator;
mod shutdown;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    tracing_subscriber::fmt().with_max_level(config.core().log_level()?).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("✅  Loaded configuration");

    let shutdown = Shutdown::listen()?;

    let connection = zbus::Connection::system().await?;
    info!("✅  Connected to the system bus");

    let recorder = EventRecorder::new(&connection).await?;
    let reporter = EventReporter::new(Arc::new(recorder), Arc::new(BootClock));
    info!("✅  Initialized event recorder");

    let label_watcher = task::spawn(watch_location_label(reporter.clone(), config.label().path().to_string(), shutdown.clone()));
    info!("✅  Initialized location label watcher");

    let provider = Arc::new(GeoClueProvider::new(connection));
    let mut orchestrator = LocationReportingOrchestrator::new(provider, reporter, &config);

    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));
    orchestrator.run(shutdown.clone().wait()).await?;

    // Location may be gated off for this image; keep serving the label until asked to stop.
    shutdown.wait().await;
    label_watcher.await?;

    info!("👋 {} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
