//! The writable overlay store: typed reads plus a persisted update primitive.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::Document;
use crate::error::OverlayError;
use crate::monitor::SettingsMonitor;

/// Typed read access to one section of a settings file, plus an `update`
/// primitive that persists changes back without disturbing sibling sections.
///
/// Reads come from the bound [`SettingsMonitor`] and are eventually
/// consistent: an `update` becomes visible to [`value`](Self::value) only
/// after the file watcher republishes, typically a few hundred milliseconds
/// later. Callers needing the fresh value immediately must re-read the file
/// themselves or wait out the propagation delay.
pub struct WritableOptions<T> {
    monitor: Arc<SettingsMonitor<T>>,
}

impl<T> WritableOptions<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    /// Wrap an existing monitor.
    pub fn new(monitor: Arc<SettingsMonitor<T>>) -> Self {
        Self { monitor }
    }

    /// Bind `section` in the file at `path` and take the initial snapshot.
    pub fn open(section: &str, path: &Path) -> Result<Self, OverlayError> {
        Ok(Self::new(SettingsMonitor::load(section, path)?))
    }

    /// The latest published snapshot of the bound section.
    pub fn value(&self) -> Arc<T> {
        self.monitor.current_value()
    }

    /// A named alternate snapshot; see [`SettingsMonitor::get`].
    pub fn get(&self, name: &str) -> Result<Arc<T>, OverlayError> {
        self.monitor.get(name)
    }

    /// The monitor publishing this store's snapshots, for attaching to a
    /// [`FileWatcher`](crate::watcher::FileWatcher).
    pub fn monitor(&self) -> Arc<SettingsMonitor<T>> {
        Arc::clone(&self.monitor)
    }

    /// Read-modify-write the bound section and persist the whole document.
    ///
    /// The full file is re-read, the section deserialized (or defaulted when
    /// absent), handed to `apply` for in-place mutation, re-serialized into
    /// the document, and the document rewritten in a single write. Sibling
    /// sections are preserved. On any error the file keeps its pre-update
    /// content.
    ///
    /// No lock is taken: two callers racing on the same file are
    /// last-writer-wins and must be serialized externally. Snapshots held by
    /// readers are unaffected until the watcher republishes.
    pub fn update(&self, apply: impl FnOnce(&mut T)) -> Result<(), OverlayError> {
        let mut doc = Document::load(self.monitor.path())?;
        let mut section: T = doc.section(self.monitor.section())?;
        apply(&mut section);
        doc.set_section(self.monitor.section(), &section)?;
        doc.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{Map, Value};
    use std::fs;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default, rename_all = "PascalCase")]
    struct CustomSettings {
        string_setting: String,
        list_of_values: Vec<String>,
    }

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.dev.json");
        fs::write(
            &path,
            r#"{
  "updateMe": { "StringSetting": "orig value", "ListOfValues": ["a", "b"] },
  "leaveMeAlone": { "StringSetting": "untouched", "ListOfValues": [] }
}"#,
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn update_round_trips_through_the_file() {
        let (_dir, path) = fixture();
        let store = WritableOptions::<CustomSettings>::open("updateMe", &path).unwrap();

        store
            .update(|opt| {
                opt.string_setting = "new value".into();
                opt.list_of_values.push("c".into());
            })
            .unwrap();

        let doc = Document::load(&path).unwrap();
        let written: CustomSettings = doc.section("updateMe").unwrap();
        assert_eq!(written.string_setting, "new value");
        assert_eq!(written.list_of_values, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_preserves_sibling_sections() {
        let (_dir, path) = fixture();
        let store = WritableOptions::<CustomSettings>::open("updateMe", &path).unwrap();
        store.update(|opt| opt.string_setting = "changed".into()).unwrap();

        let doc = Document::load(&path).unwrap();
        let sibling: CustomSettings = doc.section("leaveMeAlone").unwrap();
        assert_eq!(sibling.string_setting, "untouched");
        assert!(sibling.list_of_values.is_empty());
    }

    #[test]
    fn snapshots_are_not_retroactively_mutated() {
        let (_dir, path) = fixture();
        let store = WritableOptions::<CustomSettings>::open("updateMe", &path).unwrap();

        let before = store.value();
        store.update(|opt| opt.string_setting = "new value".into()).unwrap();

        // persisted, but the published snapshot is untouched until a reload
        assert_eq!(store.value().string_setting, "orig value");
        store.monitor().reload().unwrap();
        assert_eq!(store.value().string_setting, "new value");
        assert_eq!(before.string_setting, "orig value");
    }

    #[test]
    fn absent_section_updates_from_default() {
        let (_dir, path) = fixture();
        let store = WritableOptions::<CustomSettings>::open("brandNew", &path).unwrap();
        assert_eq!(*store.value(), CustomSettings::default());

        store.update(|opt| opt.string_setting = "first".into()).unwrap();

        let doc = Document::load(&path).unwrap();
        assert!(doc.has_section("brandNew"));
        let written: CustomSettings = doc.section("brandNew").unwrap();
        assert_eq!(written.string_setting, "first");
    }

    #[test]
    fn update_on_missing_file_fails_without_creating_it() {
        let (_dir, path) = fixture();
        let store = WritableOptions::<CustomSettings>::open("updateMe", &path).unwrap();

        fs::remove_file(&path).unwrap();
        let err = store.update(|opt| opt.string_setting = "lost".into()).unwrap_err();
        assert!(matches!(err, OverlayError::StorageRead { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn works_with_untyped_sections() {
        let (_dir, path) = fixture();
        let store = WritableOptions::<Map<String, Value>>::open("updateMe", &path).unwrap();
        store
            .update(|section| {
                section.insert("Extra".into(), Value::Bool(true));
            })
            .unwrap();

        let doc = Document::load(&path).unwrap();
        let section: Map<String, Value> = doc.section("updateMe").unwrap();
        assert_eq!(section.get("Extra"), Some(&Value::Bool(true)));
        assert_eq!(
            section.get("StringSetting"),
            Some(&Value::String("orig value".into()))
        );
    }
}
