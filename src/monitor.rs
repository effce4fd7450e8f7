//! Snapshot publication for one settings type.
//!
//! # Data Flow
//! ```text
//! Document::load → section bind → Arc<T> snapshot
//!     → ArcSwap holds the current snapshot
//!     → callers load it lock-free, keep it as long as they like
//!
//! On reload (watcher-driven):
//!     re-read document → re-bind default + cached named sections
//!     → atomic swap; old Arc<T> handles are never touched
//! ```
//!
//! # Design Decisions
//! - `current_value` never reads storage; staleness is resolved only by
//!   `reload`, which the file watcher drives with a bounded delay
//! - Named snapshots bind to the top-level section of the same name and are
//!   materialized lazily, then cached with the same staleness contract

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::de::DeserializeOwned;

use crate::document::Document;
use crate::error::OverlayError;

/// The watcher's view of anything it can refresh on a file change.
pub trait Reload: Send + Sync {
    fn reload(&self) -> Result<(), OverlayError>;
}

/// Publishes typed snapshots of one section of a settings file.
pub struct SettingsMonitor<T> {
    path: PathBuf,
    section: String,
    current: ArcSwap<T>,
    named: DashMap<String, Arc<T>>,
}

impl<T> SettingsMonitor<T>
where
    T: DeserializeOwned + Default + Send + Sync,
{
    /// Load the file and bind the initial snapshot for `section`.
    ///
    /// Fails with [`OverlayError::StorageRead`] when the file is missing; an
    /// absent section is not an error and binds to `T::default()`.
    pub fn load(section: &str, path: &Path) -> Result<Arc<Self>, OverlayError> {
        let doc = Document::load(path)?;
        let current: T = doc.section(section)?;
        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            section: section.to_string(),
            current: ArcSwap::from_pointee(current),
            named: DashMap::new(),
        }))
    }

    /// The latest published snapshot. Does not touch storage.
    pub fn current_value(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// A named alternate snapshot, bound to the top-level section `name`.
    ///
    /// The first request reads the file once; afterwards the snapshot is
    /// cached and refreshed only by [`reload`](Self::reload), so it carries
    /// the same staleness contract as [`current_value`](Self::current_value).
    pub fn get(&self, name: &str) -> Result<Arc<T>, OverlayError> {
        if let Some(snapshot) = self.named.get(name) {
            return Ok(Arc::clone(&snapshot));
        }
        let doc = Document::load(&self.path)?;
        let snapshot = Arc::new(doc.section::<T>(name)?);
        self.named.insert(name.to_string(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Re-read the document and swap in fresh snapshots for the default
    /// section and every cached named section.
    ///
    /// Snapshots handed out earlier keep their old values; only fresh
    /// fetches observe the new state. On any error nothing is republished:
    /// the default and every named snapshot keep serving their previous
    /// values.
    pub fn reload(&self) -> Result<(), OverlayError> {
        let doc = Document::load(&self.path)?;
        let fresh: Arc<T> = Arc::new(doc.section(&self.section)?);

        // bind every cached named section before publishing anything, so a
        // failed bind leaves the whole snapshot set at its previous state
        let mut rebound: Vec<(String, Arc<T>)> = Vec::with_capacity(self.named.len());
        for entry in self.named.iter() {
            rebound.push((entry.key().clone(), Arc::new(doc.section(entry.key())?)));
        }

        for (name, snapshot) in rebound {
            self.named.insert(name, snapshot);
        }
        self.current.store(fresh);
        Ok(())
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Reload for SettingsMonitor<T>
where
    T: DeserializeOwned + Default + Send + Sync,
{
    fn reload(&self) -> Result<(), OverlayError> {
        self.reload()
    }
}
