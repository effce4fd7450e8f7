//! Error definitions for document access and snapshot binding.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by document loads, section binding, and writes.
///
/// All of these are returned synchronously to the immediate caller; nothing
/// is retried or swallowed inside the crate. On a write failure the backing
/// file keeps its pre-update content.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// Backing file is missing or unreadable.
    #[error("failed to read config document {path}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rewriting the backing file failed (permissions, disk full).
    #[error("failed to write config document {path}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not a valid JSON object.
    #[error("config document {path} is not a valid JSON object")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A TOML layer handed to the builder failed to parse.
    #[error("config document {path} is not a valid TOML table")]
    MalformedToml {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// Section content cannot be coerced to the expected settings shape.
    #[error("section `{section}` does not match the expected settings shape")]
    SectionTypeMismatch {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    /// The filesystem watch could not be started.
    #[error("failed to start watching config document")]
    Watch {
        #[source]
        source: notify::Error,
    },
}
