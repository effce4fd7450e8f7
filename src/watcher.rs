//! Settings file watcher driving snapshot propagation.
//!
//! # Responsibilities
//! - Watch one settings file for modify/create events
//! - Debounce the event burst a single rewrite produces
//! - Call `reload` on every attached target, then notify subscribers
//!
//! # Design Decisions
//! - Reload failures keep the previous snapshots and are logged here; the
//!   store itself never logs
//! - Propagation latency is the debounce interval plus parse time, so a
//!   writer observes its own update only after a few hundred milliseconds

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::monitor::Reload;

/// Quiet period a changed file must hold before snapshots are republished.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches a settings file and refreshes attached monitors on change.
pub struct FileWatcher {
    path: PathBuf,
    debounce: Duration,
    targets: Arc<Mutex<Vec<Arc<dyn Reload>>>>,
}

/// Keeps the underlying filesystem watch and its reload task alive.
/// Dropping the handle stops both.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    _task: JoinHandle<()>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            debounce: DEFAULT_DEBOUNCE,
            targets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Attach a monitor to refresh on each debounced change.
    pub fn attach(&self, target: Arc<dyn Reload>) {
        self.targets
            .lock()
            .expect("watch target list mutex poisoned")
            .push(target);
    }

    /// Shared handle to the target list, for attaching after `run`.
    pub fn targets(&self) -> Arc<Mutex<Vec<Arc<dyn Reload>>>> {
        Arc::clone(&self.targets)
    }

    /// Start watching. Must be called from within a tokio runtime.
    ///
    /// Returns the keep-alive handle and a channel that yields the file path
    /// after each completed reload pass.
    pub fn run(self) -> Result<(WatcherHandle, mpsc::UnboundedReceiver<PathBuf>), notify::Error> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();
        let (reload_tx, reload_rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default(),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, debounce_ms = self.debounce.as_millis() as u64, "Settings watcher started");

        let FileWatcher {
            path,
            debounce,
            targets,
        } = self;

        let task = tokio::spawn(async move {
            while event_rx.recv().await.is_some() {
                // drain the burst until the file has been quiet for the
                // debounce interval, so a truncate-then-write pair is read
                // once, after the final content landed
                while let Ok(Some(())) = tokio::time::timeout(debounce, event_rx.recv()).await {}

                let snapshot_targets: Vec<Arc<dyn Reload>> = targets
                    .lock()
                    .expect("watch target list mutex poisoned")
                    .clone();
                for target in &snapshot_targets {
                    if let Err(e) = target.reload() {
                        tracing::error!(
                            path = ?path,
                            "Failed to reload settings: {}. Keeping current snapshots.",
                            e
                        );
                    }
                }
                tracing::debug!(path = ?path, targets = snapshot_targets.len(), "Settings change applied");
                let _ = reload_tx.send(path.clone());
            }
        });

        Ok((
            WatcherHandle {
                _watcher: watcher,
                _task: task,
            },
            reload_rx,
        ))
    }
}
