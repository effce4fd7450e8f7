//! Writable, hot-reloadable configuration overlays.
//!
//! # Data Flow
//! ```text
//! settings file (JSON)
//!     → document.rs (parse the whole file)
//!     → monitor.rs (typed section snapshot, atomic Arc swap)
//!     → callers hold Arc<T> snapshots for as long as they like
//!
//! On update:
//!     store.rs re-reads the document
//!     → mutates one section in place
//!     → rewrites the full file (siblings preserved)
//!     → watcher.rs notices the change, waits out the debounce
//!     → monitor republishes fresh snapshots
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once handed out; only a fresh fetch observes a write
//! - Update propagation is eventual: the watcher debounce (200 ms by default)
//!   sits between a successful write and its visibility to readers
//! - The store never logs and never retries; errors surface to the caller

pub mod builder;
pub mod document;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod store;
pub mod watcher;

pub use builder::{ConfigBuilder, ConfigRoot};
pub use document::Document;
pub use error::OverlayError;
pub use monitor::{Reload, SettingsMonitor};
pub use registry::OverlayRegistry;
pub use store::WritableOptions;
pub use watcher::{FileWatcher, WatcherHandle, DEFAULT_DEBOUNCE};
