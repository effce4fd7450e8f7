//! Explicit registry composing stores, monitors, and watchers.
//!
//! The original pattern registers writable options in a dependency container;
//! here composition is explicit: one store per (type, section, file)
//! registration, one shared filesystem watch per file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::OverlayError;
use crate::monitor::{Reload, SettingsMonitor};
use crate::store::WritableOptions;
use crate::watcher::{FileWatcher, WatcherHandle, DEFAULT_DEBOUNCE};

struct WatchedFile {
    targets: Arc<Mutex<Vec<Arc<dyn Reload>>>>,
    _handle: WatcherHandle,
}

/// Constructs writable option stores and keeps their file watches alive.
///
/// Dropping the registry stops every watch it started; stores handed out
/// earlier keep working but their snapshots stop refreshing.
pub struct OverlayRegistry {
    debounce: Duration,
    files: DashMap<PathBuf, WatchedFile>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    /// A registry whose watchers republish after `debounce` of quiet.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            files: DashMap::new(),
        }
    }

    /// Build one writable store bound to `section` of the file at `path`,
    /// wired to a (possibly shared) watch on that file.
    ///
    /// The initial snapshot is taken synchronously, so a missing or
    /// malformed file fails here rather than on first read. Must be called
    /// from within a tokio runtime.
    pub fn configure_writable<T>(
        &self,
        section: &str,
        path: &Path,
    ) -> Result<WritableOptions<T>, OverlayError>
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
    {
        let monitor = SettingsMonitor::<T>::load(section, path)?;
        let target: Arc<dyn Reload> = monitor.clone();

        match self.files.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => {
                entry
                    .get()
                    .targets
                    .lock()
                    .expect("watch target list mutex poisoned")
                    .push(target);
            }
            Entry::Vacant(slot) => {
                let watcher = FileWatcher::new(path).with_debounce(self.debounce);
                watcher.attach(target);
                let targets = watcher.targets();
                let (handle, _reloads) = watcher
                    .run()
                    .map_err(|source| OverlayError::Watch { source })?;
                slot.insert(WatchedFile {
                    targets,
                    _handle: handle,
                });
            }
        }

        Ok(WritableOptions::new(monitor))
    }

    /// Number of files currently under watch.
    pub fn watched_files(&self) -> usize {
        self.files.len()
    }
}

impl Default for OverlayRegistry {
    fn default() -> Self {
        Self::new()
    }
}
