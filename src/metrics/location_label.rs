use crate::metrics::reporter::EventReporter;
use crate::shutdown::Shutdown;
use config::{Config, ConfigError, FileFormat};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

const LABEL_GROUP: &str = "Label";

/// Reads the operator supplied label. A missing file means no label.
pub fn load_location_label(path: &str) -> Result<Option<Vec<(String, String)>>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let key_file = Config::builder().add_source(config::File::new(path, FileFormat::Ini)).build()?;
    Ok(location_label(key_file))
}

/// Entries of the `[Label]` group sorted by key, or `None` when it holds nothing.
fn location_label(key_file: Config) -> Option<Vec<(String, String)>> {
    let groups = key_file.try_deserialize::<HashMap<String, config::Value>>().ok()?;
    let (_, group) = groups.into_iter().find(|(name, _)| name.eq_ignore_ascii_case(LABEL_GROUP))?;

    let mut label = group
        .into_table()
        .ok()?
        .into_iter()
        .filter_map(|(key, value)| value.into_string().ok().map(|value| (key, value)))
        .collect::<Vec<_>>();

    if label.is_empty() {
        return None;
    }

    label.sort();
    Some(label)
}

#[instrument(skip(reporter))]
pub async fn record_location_label(reporter: &EventReporter, path: &str) {
    match load_location_label(path) {
        Ok(Some(label)) => {
            let description = label.iter().map(|(key, value)| format!("\"{}\" = \"{}\"", key, value)).collect::<Vec<_>>().join(", ");
            info!("🏷️ Recording location label: {}", description);

            if let Err(e) = reporter.report_label(label).await {
                warn!("⚠️ Unable to record the location label: {}", e);
            }
        }
        Ok(None) => debug!("🏷️ No location label configured"),
        Err(e) => warn!("⚠️ Failed to load {}, unable to record location label: {}", path, e),
    }
}

/// Reports every completed write to the label file. The parent directory is
/// watched, so the file may appear after the daemon started.
pub struct LabelFileWatcher {
    _watcher: RecommendedWatcher,
    changes: mpsc::UnboundedReceiver<()>,
}

impl LabelFileWatcher {
    pub fn new(path: &Path) -> notify::Result<Self> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().map(OsStr::to_os_string);
        let (tx, changes) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let ours = event.paths.iter().any(|changed| changed.file_name() == file_name.as_deref());
                if ours && is_completed_write(&event.kind) {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!("⚠️ Location label watch error: {}", e),
        })?;
        watcher.watch(directory, RecursiveMode::NonRecursive)?;

        Ok(LabelFileWatcher { _watcher: watcher, changes })
    }

    pub async fn changed(&mut self) -> Option<()> {
        self.changes.recv().await
    }
}

/// Writers either close the file after writing or rename a finished file over it.
fn is_completed_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

/// Records the label once, then again whenever the file is rewritten, until shutdown.
#[instrument(skip(reporter, shutdown))]
pub async fn watch_location_label(reporter: EventReporter, path: String, shutdown: Shutdown) {
    let watcher = LabelFileWatcher::new(Path::new(&path));
    record_location_label(&reporter, &path).await;

    let mut watcher = match watcher {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!("⚠️ Couldn't set up file monitor for {}: {}", path, e);
            return;
        }
    };

    let stopped = shutdown.wait();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = &mut stopped => return,
            changed = watcher.changed() => {
                if changed.is_none() {
                    return;
                }
                info!("🔁 {} changed, recording the location label again", path);
                record_location_label(&reporter, &path).await;
            }
        }
    }
}
