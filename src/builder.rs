//! Layered configuration loading.
//!
//! Multiple files stack into one merged root: later layers override earlier
//! ones key-by-key, objects merge recursively, scalars and arrays replace.
//! A typical stack is a base `appsettings.json` plus an environment overlay
//! like `appsettings.dev.json`, optionally mixed with TOML files.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::document::bind_section;
use crate::error::OverlayError;

enum Format {
    Json,
    Toml,
}

struct Layer {
    path: PathBuf,
    format: Format,
    optional: bool,
}

/// Collects configuration layers and merges them into a [`ConfigRoot`].
#[derive(Default)]
pub struct ConfigBuilder {
    layers: Vec<Layer>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a JSON layer. A missing file is an error unless `optional`.
    pub fn add_json_file(mut self, path: impl Into<PathBuf>, optional: bool) -> Self {
        self.layers.push(Layer {
            path: path.into(),
            format: Format::Json,
            optional,
        });
        self
    }

    /// Add a TOML layer. A missing file is an error unless `optional`.
    pub fn add_toml_file(mut self, path: impl Into<PathBuf>, optional: bool) -> Self {
        self.layers.push(Layer {
            path: path.into(),
            format: Format::Toml,
            optional,
        });
        self
    }

    /// Load every layer in order and merge them into one root.
    pub fn build(self) -> Result<ConfigRoot, OverlayError> {
        let mut root = Map::new();
        for layer in self.layers {
            let text = match fs::read_to_string(&layer.path) {
                Ok(text) => text,
                Err(e) if layer.optional && e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(OverlayError::StorageRead {
                        path: layer.path,
                        source,
                    })
                }
            };
            let overlay = match layer.format {
                Format::Json => serde_json::from_str(&text).map_err(|source| {
                    OverlayError::MalformedDocument {
                        path: layer.path.clone(),
                        source,
                    }
                })?,
                Format::Toml => {
                    let table: toml::Table =
                        text.parse().map_err(|source: toml::de::Error| {
                            OverlayError::MalformedToml {
                                path: layer.path.clone(),
                                source: Box::new(source),
                            }
                        })?;
                    json_object_from_toml(table, &layer.path)?
                }
            };
            merge_into(&mut root, overlay);
        }
        Ok(ConfigRoot { root })
    }
}

/// The merged result of every configuration layer.
#[derive(Debug)]
pub struct ConfigRoot {
    root: Map<String, Value>,
}

impl ConfigRoot {
    pub fn has_section(&self, name: &str) -> bool {
        self.root.contains_key(name)
    }

    /// Bind one top-level section to `T`; absent sections bind to the
    /// default value.
    pub fn section<T>(&self, name: &str) -> Result<T, OverlayError>
    where
        T: DeserializeOwned + Default,
    {
        bind_section(&self.root, name)
    }

    /// Hydrate the entire merged root into `T`.
    pub fn bind<T>(&self) -> Result<T, OverlayError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.root.clone())).map_err(|source| {
            OverlayError::SectionTypeMismatch {
                section: "(root)".to_string(),
                source,
            }
        })
    }
}

fn json_object_from_toml(
    table: toml::Table,
    path: &std::path::Path,
) -> Result<Map<String, Value>, OverlayError> {
    match serde_json::to_value(table) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(OverlayError::MalformedDocument {
            path: path.to_path_buf(),
            source: serde_json::Error::io(io::Error::new(
                io::ErrorKind::InvalidData,
                "TOML table did not convert to a JSON object",
            )),
        }),
        Err(source) => Err(OverlayError::MalformedDocument {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct Hello {
        name: String,
    }

    fn write(dir: &std::path::Path, file: &str, content: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn later_layer_overrides_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(
            dir.path(),
            "appsettings.json",
            r#"{ "hello": { "name": "George" }, "overwriteMe": { "name": "base" } }"#,
        );
        let env = write(
            dir.path(),
            "appsettings.dev.json",
            r#"{ "world": { "name": "Paul" }, "overwriteMe": { "name": "overwrite" } }"#,
        );

        let root = ConfigBuilder::new()
            .add_json_file(base, false)
            .add_json_file(env, false)
            .build()
            .unwrap();

        assert_eq!(root.section::<Hello>("hello").unwrap().name, "George");
        assert_eq!(root.section::<Hello>("world").unwrap().name, "Paul");
        assert_eq!(root.section::<Hello>("overwriteMe").unwrap().name, "overwrite");
    }

    #[test]
    fn objects_merge_key_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(
            dir.path(),
            "base.json",
            r#"{ "section": { "keep": "yes", "replace": "old" } }"#,
        );
        let env = write(dir.path(), "env.json", r#"{ "section": { "replace": "new" } }"#);

        let root = ConfigBuilder::new()
            .add_json_file(base, false)
            .add_json_file(env, false)
            .build()
            .unwrap();

        let section: Map<String, Value> = root.section("section").unwrap();
        assert_eq!(section.get("keep"), Some(&Value::String("yes".into())));
        assert_eq!(section.get("replace"), Some(&Value::String("new".into())));
    }

    #[test]
    fn optional_missing_layer_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.json", r#"{ "hello": { "name": "George" } }"#);

        let root = ConfigBuilder::new()
            .add_json_file(base, false)
            .add_json_file(dir.path().join("absent.json"), true)
            .build()
            .unwrap();
        assert_eq!(root.section::<Hello>("hello").unwrap().name, "George");

        let err = ConfigBuilder::new()
            .add_json_file(dir.path().join("absent.json"), false)
            .build()
            .unwrap_err();
        assert!(matches!(err, OverlayError::StorageRead { .. }));
    }

    #[test]
    fn toml_layer_merges_into_json_root() {
        let dir = tempfile::tempdir().unwrap();
        let base = write(dir.path(), "base.json", r#"{ "hello": { "name": "George" } }"#);
        let toml = write(dir.path(), "extra.toml", "[world]\nname = \"Paul\"\n");

        let root = ConfigBuilder::new()
            .add_json_file(base, false)
            .add_toml_file(toml, false)
            .build()
            .unwrap();

        assert_eq!(root.section::<Hello>("hello").unwrap().name, "George");
        assert_eq!(root.section::<Hello>("world").unwrap().name, "Paul");
    }

    #[test]
    fn malformed_toml_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "not toml at all [");
        let err = ConfigBuilder::new().add_toml_file(bad, false).build().unwrap_err();
        assert!(matches!(err, OverlayError::MalformedToml { .. }));
    }

    #[test]
    fn bind_hydrates_the_whole_root() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Root {
            hello: Hello,
            world: Hello,
        }

        let dir = tempfile::tempdir().unwrap();
        let base = write(
            dir.path(),
            "base.json",
            r#"{ "hello": { "name": "George" }, "world": { "name": "Paul" } }"#,
        );

        let root = ConfigBuilder::new().add_json_file(base, false).build().unwrap();
        let bound: Root = root.bind().unwrap();
        assert_eq!(bound.hello.name, "George");
        assert_eq!(bound.world.name, "Paul");
    }
}
