use crate::domain::LocationReading;
use crate::geoclue::provider::{LocationHandle, LocationProvider, LocationUpdate, ProviderError, ProviderSession};
use crate::geoclue::proxies::{ClientProxy, LocationProxy, ManagerProxy};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc::Receiver;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use zbus::Connection;

const UPDATE_BUFFER_SIZE: usize = 16;

/// GeoClue2 reached over the system bus.
#[derive(Debug, Clone)]
pub struct GeoClueProvider {
    connection: Connection,
}

impl GeoClueProvider {
    pub fn new(connection: Connection) -> Self {
        GeoClueProvider { connection }
    }
}

#[async_trait]
impl LocationProvider for GeoClueProvider {
    #[instrument(skip_all)]
    async fn get_client(&self) -> Result<Box<dyn ProviderSession>, ProviderError> {
        let unavailable = |e: zbus::Error| ProviderError::ProviderUnavailable(e.to_string());

        let manager = ManagerProxy::new(&self.connection).await.map_err(unavailable)?;
        let client_path = manager.get_client().await.map_err(unavailable)?;
        debug!(path = client_path.as_str(), "GeoClue handed out a client");

        let client = ClientProxy::builder(&self.connection)
            .path(client_path.as_str().to_owned())
            .map_err(unavailable)?
            .build()
            .await
            .map_err(unavailable)?;

        Ok(Box::new(GeoClueSession {
            connection: self.connection.clone(),
            path: client_path.as_str().to_owned(),
            client,
            forwarder: Mutex::new(None),
        }))
    }
}

#[derive(Debug)]
struct GeoClueSession {
    connection: Connection,
    path: String,
    client: ClientProxy<'static>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

fn rejected(request: &'static str) -> impl Fn(zbus::Error) -> ProviderError {
    move |e| ProviderError::ProviderRejected {
        request,
        reason: e.to_string(),
    }
}

#[async_trait]
impl ProviderSession for GeoClueSession {
    fn id(&self) -> &str {
        &self.path
    }

    async fn set_desktop_id(&self, desktop_id: &str) -> Result<(), ProviderError> {
        self.client.set_desktop_id(desktop_id).await.map_err(rejected("DesktopId"))
    }

    async fn set_requested_accuracy_level(&self, level: u32) -> Result<(), ProviderError> {
        self.client.set_requested_accuracy_level(level).await.map_err(rejected("RequestedAccuracyLevel"))
    }

    async fn set_distance_threshold(&self, meters: u32) -> Result<(), ProviderError> {
        self.client.set_distance_threshold(meters).await.map_err(rejected("DistanceThreshold"))
    }

    #[instrument(skip_all, fields(session = %self.path))]
    async fn subscribe(&self) -> Result<Receiver<LocationUpdate>, ProviderError> {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER_SIZE);
        let (ready_tx, ready_rx) = oneshot::channel();
        let client = self.client.clone();

        let forwarder = tokio::spawn(async move {
            let mut signals = match client.receive_location_updated().await {
                Ok(signals) => {
                    let _ = ready_tx.send(Ok(()));
                    signals
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while let Some(signal) = signals.next().await {
                let update = match signal.args() {
                    Ok(args) => LocationUpdate {
                        old: LocationHandle::new(args.old_path().as_str()),
                        new: LocationHandle::new(args.new_path().as_str()),
                    },
                    Err(e) => {
                        warn!("⚠️ Ignoring malformed LocationUpdated signal: {}", e);
                        continue;
                    }
                };

                if tx.send(update).await.is_err() {
                    debug!("Location update receiver dropped, no longer forwarding");
                    break;
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                *self.forwarder.lock().await = Some(forwarder);
                Ok(rx)
            }
            Ok(Err(e)) => Err(ProviderError::ProviderUnavailable(e.to_string())),
            Err(_) => Err(ProviderError::SubscriptionClosed),
        }
    }

    async fn start(&self) -> Result<(), ProviderError> {
        self.client.start().await.map_err(rejected("Start"))
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        if let Some(forwarder) = self.forwarder.lock().await.take() {
            forwarder.abort();
        }

        self.client.stop().await.map_err(rejected("Stop"))
    }

    #[instrument(skip(self))]
    async fn resolve(&self, location: &LocationHandle) -> Result<LocationReading, ProviderError> {
        let unresolved = |e: zbus::Error| ProviderError::UnresolvedLocationReference {
            path: location.clone(),
            reason: e.to_string(),
        };

        let proxy = LocationProxy::builder(&self.connection)
            .path(location.as_str().to_owned())
            .map_err(unresolved)?
            .build()
            .await
            .map_err(unresolved)?;

        Ok(LocationReading {
            latitude: proxy.latitude().await.map_err(unresolved)?,
            longitude: proxy.longitude().await.map_err(unresolved)?,
            altitude: proxy.altitude().await.map_err(unresolved)?,
            accuracy: proxy.accuracy().await.map_err(unresolved)?,
        })
    }
}
