//! In-process stand-ins for the provider and the metrics sink.

use crate::domain::{LocationReading, MetricEvent};
use crate::geoclue::{LocationHandle, LocationProvider, LocationUpdate, ProviderError, ProviderSession};
use crate::metrics::{Clock, MetricsSink, SinkError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::{Receiver, Sender};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionCall {
    GetClient,
    SetDesktopId(String),
    SetRequestedAccuracyLevel(u32),
    SetDistanceThreshold(u32),
    Subscribe,
    Start,
    Stop,
    Resolve(String),
}

#[derive(Debug, Default)]
struct ProviderState {
    calls: Mutex<Vec<SessionCall>>,
    locations: Mutex<HashMap<String, LocationReading>>,
    script: Mutex<Vec<LocationUpdate>>,
    keep_open: Mutex<Option<Option<Sender<LocationUpdate>>>>,
    unavailable_attempts: AtomicUsize,
    rejected: Mutex<Option<&'static str>>,
}

/// Emits its scripted updates right after subscription, then closes the stream
/// unless told to keep it open.
#[derive(Clone, Debug, Default)]
pub struct FakeProvider {
    state: Arc<ProviderState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider::default()
    }

    pub fn with_location(self, path: &str, reading: LocationReading) -> Self {
        self.state.locations.lock().unwrap().insert(path.to_string(), reading);
        self
    }

    pub fn with_update(self, old: &str, new: &str) -> Self {
        self.state.script.lock().unwrap().push(LocationUpdate {
            old: LocationHandle::new(old),
            new: LocationHandle::new(new),
        });
        self
    }

    pub fn keep_open(self) -> Self {
        *self.state.keep_open.lock().unwrap() = Some(None);
        self
    }

    pub fn unavailable_for(self, attempts: usize) -> Self {
        self.state.unavailable_attempts.store(attempts, Ordering::SeqCst);
        self
    }

    pub fn rejecting(self, request: &'static str) -> Self {
        *self.state.rejected.lock().unwrap() = Some(request);
        self
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.state.calls.lock().unwrap().clone()
    }

    /// The sender of a stream kept open with [`FakeProvider::keep_open`].
    pub fn sender(&self) -> Option<Sender<LocationUpdate>> {
        self.state.keep_open.lock().unwrap().clone().flatten()
    }
}

#[async_trait]
impl LocationProvider for FakeProvider {
    async fn get_client(&self) -> Result<Box<dyn ProviderSession>, ProviderError> {
        self.state.calls.lock().unwrap().push(SessionCall::GetClient);

        let unavailable = self
            .state
            .unavailable_attempts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |attempts| attempts.checked_sub(1))
            .is_ok();
        if unavailable {
            return Err(ProviderError::ProviderUnavailable("no manager on the bus".to_string()));
        }

        Ok(Box::new(FakeSession { state: self.state.clone() }))
    }
}

#[derive(Debug)]
struct FakeSession {
    state: Arc<ProviderState>,
}

impl FakeSession {
    fn call(&self, request: &'static str, call: SessionCall) -> Result<(), ProviderError> {
        self.state.calls.lock().unwrap().push(call);

        if *self.state.rejected.lock().unwrap() == Some(request) {
            return Err(ProviderError::ProviderRejected {
                request,
                reason: "not allowed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderSession for FakeSession {
    fn id(&self) -> &str {
        "/org/freedesktop/GeoClue2/Client/1"
    }

    async fn set_desktop_id(&self, desktop_id: &str) -> Result<(), ProviderError> {
        self.call("DesktopId", SessionCall::SetDesktopId(desktop_id.to_string()))
    }

    async fn set_requested_accuracy_level(&self, level: u32) -> Result<(), ProviderError> {
        self.call("RequestedAccuracyLevel", SessionCall::SetRequestedAccuracyLevel(level))
    }

    async fn set_distance_threshold(&self, meters: u32) -> Result<(), ProviderError> {
        self.call("DistanceThreshold", SessionCall::SetDistanceThreshold(meters))
    }

    async fn subscribe(&self) -> Result<Receiver<LocationUpdate>, ProviderError> {
        self.call("Subscribe", SessionCall::Subscribe)?;

        let script = self.state.script.lock().unwrap().clone();
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for update in script {
            tx.try_send(update).unwrap();
        }

        let mut keep_open = self.state.keep_open.lock().unwrap();
        if keep_open.is_some() {
            *keep_open = Some(Some(tx));
        }

        Ok(rx)
    }

    async fn start(&self) -> Result<(), ProviderError> {
        self.call("Start", SessionCall::Start)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.call("Stop", SessionCall::Stop)
    }

    async fn resolve(&self, location: &LocationHandle) -> Result<LocationReading, ProviderError> {
        self.call("Resolve", SessionCall::Resolve(location.to_string()))?;

        self.state
            .locations
            .lock()
            .unwrap()
            .get(location.as_str())
            .copied()
            .ok_or_else(|| ProviderError::UnresolvedLocationReference {
                path: location.clone(),
                reason: "no such object".to_string(),
            })
    }
}

/// Collects accepted events; the first `failures` submissions are refused.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<MetricEvent>>,
    attempts: AtomicUsize,
    failures: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn failing(failures: usize) -> Self {
        RecordingSink {
            failures: AtomicUsize::new(failures),
            ..RecordingSink::default()
        }
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn record_singular_event(&self, event: &MetricEvent) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |failures| failures.checked_sub(1))
            .is_ok();
        if refused {
            return Err(SinkError::SubmissionFailed {
                event_id: event.event_id,
                reason: "recorder went away".to_string(),
            });
        }

        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Holds every submission until [`BlockingSink::release`] is called.
#[derive(Debug, Default)]
pub struct BlockingSink {
    inner: RecordingSink,
    entered: Notify,
    released: Notify,
}

impl BlockingSink {
    pub fn new() -> Self {
        BlockingSink::default()
    }

    /// Resolves once a submission is waiting.
    pub async fn entered(&self) {
        self.entered.notified().await
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.inner.events()
    }
}

#[async_trait]
impl MetricsSink for BlockingSink {
    async fn record_singular_event(&self, event: &MetricEvent) -> Result<(), SinkError> {
        self.entered.notify_one();
        self.released.notified().await;
        self.inner.record_singular_event(event).await
    }
}

#[derive(Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn relative_timestamp(&self) -> nix::Result<i64> {
        Ok(self.0)
    }
}
