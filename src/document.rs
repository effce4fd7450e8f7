//! The backing document: a JSON object file read and rewritten wholesale.
//!
//! # Responsibilities
//! - Parse the entire file into an ordered key → value map
//! - Bind one top-level section to a typed value (default when absent)
//! - Replace one section and persist the full document in a single write
//!
//! # Design Decisions
//! - The document is ephemeral: load, mutate one section, save, discard.
//!   No authoritative in-memory copy survives across updates.
//! - Save is one `fs::write` of the fully serialized text. There is no
//!   temp-file rename, so a crash mid-write can corrupt the file; the write
//!   never partially applies at the API level.
//! - Pretty-printed output keeps the file human-diffable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::OverlayError;

/// A fully parsed configuration file, keyed by top-level section name.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    root: Map<String, Value>,
}

impl Document {
    /// Read and parse the whole file at `path`.
    pub fn load(path: &Path) -> Result<Self, OverlayError> {
        let text = fs::read_to_string(path).map_err(|source| OverlayError::StorageRead {
            path: path.to_path_buf(),
            source,
        })?;
        let root = serde_json::from_str(&text).map_err(|source| OverlayError::MalformedDocument {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.root.contains_key(name)
    }

    /// Deserialize the named top-level section into `T`.
    ///
    /// An absent section yields `T::default()`; a present section that does
    /// not fit `T`'s shape yields [`OverlayError::SectionTypeMismatch`].
    pub fn section<T>(&self, name: &str) -> Result<T, OverlayError>
    where
        T: DeserializeOwned + Default,
    {
        bind_section(&self.root, name)
    }

    /// Re-serialize `value` and replace the named section. Sibling sections
    /// are untouched.
    pub fn set_section<T>(&mut self, name: &str, value: &T) -> Result<(), OverlayError>
    where
        T: Serialize,
    {
        let value =
            serde_json::to_value(value).map_err(|source| OverlayError::SectionTypeMismatch {
                section: name.to_string(),
                source,
            })?;
        self.root.insert(name.to_string(), value);
        Ok(())
    }

    /// Serialize the full document and overwrite the backing file.
    pub fn save(&self) -> Result<(), OverlayError> {
        let text = serde_json::to_string_pretty(&self.root).map_err(|e| {
            OverlayError::StorageWrite {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;
        fs::write(&self.path, text).map_err(|source| OverlayError::StorageWrite {
            path: self.path.clone(),
            source,
        })
    }
}

/// Shared binding logic for [`Document`] and the layered builder root.
pub(crate) fn bind_section<T>(root: &Map<String, Value>, name: &str) -> Result<T, OverlayError>
where
    T: DeserializeOwned + Default,
{
    match root.get(name) {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
            OverlayError::SectionTypeMismatch {
                section: name.to_string(),
                source,
            }
        }),
    }
}
