//! Reading and writing configurations: files, strings, mappings and the environment

use crate::configuration::Configuration;
use crate::env::EnvSource;
use polyconf_codecs::CodecRegistry;
use polyconf_types::utils::preview;
use polyconf_types::{CodecError, Map, PolyconfError, Result, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 30;

impl Configuration {
    /// Build a configuration from a nested mapping
    pub fn from_dict(map: Map) -> Self {
        let mut cfg = Self::new();
        cfg.update_from_dict(map, None);
        cfg
    }

    /// Parse a document in the given format
    pub fn from_str(text: &str, format: &str) -> Result<Self> {
        let mut cfg = Self::new();
        cfg.update_from_str(text, format)?;
        Ok(cfg)
    }

    /// Read a file, guessing the format from its extension unless one is given
    ///
    /// The configuration is named after the file.
    pub fn from_file(path: impl AsRef<Path>, format: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let mut cfg = Self::new();
        if let Some(stem) = path.file_stem() {
            cfg.set_name(stem.to_string_lossy());
        }
        cfg.update_from_file(path, format)?;
        Ok(cfg)
    }

    /// Build a configuration from environment variables
    pub fn from_env(source: &EnvSource) -> Self {
        let mut cfg = Self::new();
        cfg.update_from_env(source);
        cfg
    }

    pub fn update_from_dict(&mut self, map: Map, source: Option<&str>) {
        self.update_from_map(map, source);
    }

    pub fn update_from_str(&mut self, text: &str, format: &str) -> Result<()> {
        let source = format!("String: {} ({format} reader)", preview(text, PREVIEW_CHARS));
        let document = CodecRegistry::global().read(format, text)?;
        self.update_from_dict(document_root(document, format)?, Some(&source));
        Ok(())
    }

    pub fn update_from_file(&mut self, path: impl AsRef<Path>, format: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let registry = CodecRegistry::global();
        let format = match format {
            Some(format) => registry.get(format)?.name(),
            None => registry.guess_format(path)?,
        };

        let text = fs::read_to_string(path).map_err(|source| PolyconfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let document = registry
            .read(format, &text)
            .and_then(|document| document_root(document, format))
            .map_err(|source| PolyconfError::Document {
                path: path.display().to_string(),
                source,
            })?;

        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let source = format!(
            "{} ({} reader)",
            resolved.display(),
            format.to_ascii_uppercase()
        );
        debug!(path = %path.display(), format, "Read configuration file");
        self.update_from_dict(document, Some(&source));
        Ok(())
    }

    /// Add environment variables; a variable that conflicts with the tree is skipped
    pub fn update_from_env(&mut self, source: &EnvSource) {
        for value in source.values() {
            if let Err(err) = self.update_entry(&value.path, value.value, Some(&value.source)) {
                warn!(source = %value.source, error = %err, "Skipping environment variable");
            }
        }
    }

    /// Write the configuration to a file, guessing the format from its extension
    pub fn as_file(&self, path: impl AsRef<Path>, format: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let registry = CodecRegistry::global();
        let format = match format {
            Some(format) => format,
            None => registry.guess_format(path)?,
        };

        let text = self.as_str_with(registry, format, true)?;
        fs::write(path, text).map_err(|source| PolyconfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), format, "Wrote configuration file");
        Ok(())
    }
}

/// Top level of a document as a mapping; an empty document is an empty mapping
fn document_root(document: Value, format: &str) -> std::result::Result<Map, CodecError> {
    match document {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(CodecError::parse(
            format,
            format!("expected a mapping at the top level, found {}", other.type_name()),
        )),
    }
}

enum Layer {
    Defaults(Map),
    File {
        path: PathBuf,
        format: Option<String>,
        required: bool,
    },
    Text {
        text: String,
        format: String,
    },
    Env(EnvSource),
}

/// Builds a configuration from layered sources
///
/// Layers are merged in the order they are added, later layers overriding
/// earlier ones.
#[derive(Default)]
pub struct ConfigLoader {
    name: Option<String>,
    layers: Vec<Layer>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Built-in values, usually the first layer
    pub fn defaults(mut self, defaults: Map) -> Self {
        self.layers.push(Layer::Defaults(defaults));
        self
    }

    /// A file that must exist
    pub fn file(self, path: impl Into<PathBuf>) -> Self {
        self.push_file(path.into(), None, true)
    }

    /// A file in an explicit format
    pub fn file_with_format(self, path: impl Into<PathBuf>, format: &str) -> Self {
        self.push_file(path.into(), Some(format.to_string()), true)
    }

    /// A file that is skipped when it does not exist
    pub fn optional_file(self, path: impl Into<PathBuf>) -> Self {
        self.push_file(path.into(), None, false)
    }

    /// An in-memory document
    pub fn string(mut self, text: impl Into<String>, format: &str) -> Self {
        self.layers.push(Layer::Text {
            text: text.into(),
            format: format.to_string(),
        });
        self
    }

    pub fn env(mut self, source: EnvSource) -> Self {
        self.layers.push(Layer::Env(source));
        self
    }

    fn push_file(mut self, path: PathBuf, format: Option<String>, required: bool) -> Self {
        self.layers.push(Layer::File {
            path,
            format,
            required,
        });
        self
    }

    /// Read every layer and merge them
    pub fn load(&self) -> Result<Configuration> {
        let mut cfg = Configuration::new();
        if let Some(name) = &self.name {
            cfg.set_name(name);
        }

        for layer in &self.layers {
            let mut next = Configuration::new();
            match layer {
                Layer::Defaults(defaults) => next.update_from_dict(defaults.clone(), Some("defaults")),
                Layer::File {
                    path,
                    format,
                    required,
                } => {
                    if !required && !path.exists() {
                        debug!(path = %path.display(), "Optional configuration file not found");
                        continue;
                    }
                    next.update_from_file(path, format.as_deref())?;
                }
                Layer::Text { text, format } => next.update_from_str(text, format)?,
                Layer::Env(source) => next.update_from_env(source),
            }
            cfg.merge_with(&next, true);
        }

        debug!(
            name = ?self.name,
            layers = self.layers.len(),
            leafs = cfg.leafs().len(),
            "Configuration loaded"
        );
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile, TempDir};

    const TOML_CONFIG: &str = r#"
name = "polyconf"
versions = [1, 2, 3]

[author]
firstname = "Geir Arne"
lastname = "Hjelle"

[[servers]]
host = "a"
port = 80

[[servers]]
host = "b"
port = 81
"#;

    fn sample() -> Configuration {
        Configuration::from_str(TOML_CONFIG, "toml").unwrap()
    }

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_str() {
        let cfg = sample();
        assert_eq!(cfg.value("author.lastname").unwrap(), Value::from("Hjelle"));
        assert_eq!(cfg.value("servers.1.port").unwrap(), Value::Integer(81));

        let node = cfg.get("name").unwrap();
        let source = node.as_entry().unwrap().source().unwrap();
        assert!(source.starts_with("String: \nname = \"polyconf\"\nversions ="));
        assert!(source.ends_with(" ... (toml reader)"));
    }

    #[test]
    fn test_from_str_errors() {
        assert!(matches!(
            Configuration::from_str("a = ", "toml"),
            Err(PolyconfError::Codec(CodecError::Parse { .. }))
        ));
        assert!(matches!(
            Configuration::from_str("[1, 2]", "json"),
            Err(PolyconfError::Codec(CodecError::Parse { .. }))
        ));
        assert!(matches!(
            Configuration::from_str("{}", "xml"),
            Err(PolyconfError::Codec(CodecError::UnknownFormat { .. }))
        ));
        assert!(Configuration::from_str("", "yaml").unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_every_format() {
        let original = sample();
        for format in ["ini", "json", "toml", "yaml"] {
            let text = original.as_str(format).unwrap();
            let copy = Configuration::from_str(&text, format).unwrap();
            assert_eq!(copy.as_dict(), original.as_dict(), "round trip through {format}");
        }
    }

    #[test]
    fn test_from_file_and_as_file() {
        let file = temp_file(".toml", TOML_CONFIG);
        let cfg = Configuration::from_file(file.path(), None).unwrap();

        let stem = file.path().file_stem().unwrap().to_string_lossy().to_string();
        assert_eq!(cfg.name(), Some(stem.as_str()));
        let source = cfg.get_source("name").unwrap();
        assert!(source.ends_with(" (TOML reader)"));

        let dir = TempDir::new().unwrap();
        for name in ["copy.json", "copy.yml", "copy.cfg"] {
            let path = dir.path().join(name);
            cfg.as_file(&path, None).unwrap();
            let copy = Configuration::from_file(&path, None).unwrap();
            assert_eq!(copy.as_dict(), cfg.as_dict(), "round trip through {name}");
        }
    }

    #[test]
    fn test_from_file_errors() {
        let err = Configuration::from_file("/nonexistent/polyconf.toml", None).unwrap_err();
        assert!(matches!(err, PolyconfError::Io { .. }));
        assert!(err.to_string().starts_with("Could not access /nonexistent/polyconf.toml"));

        let file = temp_file(".json", "{\"name\": ");
        let err = Configuration::from_file(file.path(), None).unwrap_err();
        assert!(matches!(err, PolyconfError::Document { .. }));

        let file = temp_file(".txt", "name = 1");
        assert!(matches!(
            Configuration::from_file(file.path(), None),
            Err(PolyconfError::Codec(CodecError::UndetectableFormat { .. }))
        ));
        assert!(Configuration::from_file(file.path(), Some("toml")).is_ok());
    }

    #[test]
    fn test_from_dict() {
        let map: Map = vec![
            ("name", Value::from("polyconf")),
            ("paths", Value::from(vec!["a", "b"])),
        ]
        .into_iter()
        .collect();
        let cfg = Configuration::from_dict(map.clone());
        assert_eq!(cfg.as_dict(), Value::Map(map));
    }

    #[test]
    fn test_from_env_skips_conflicts() {
        temp_env::with_vars(
            [
                ("PCTEST_LOADER_DATABASE", Some("sqlite")),
                ("PCTEST_LOADER_DATABASE__PORT", Some("5432")),
                ("PCTEST_LOADER_USER", Some("admin")),
            ],
            || {
                let cfg = Configuration::from_env(&EnvSource::prefixed("PCTEST_LOADER_"));
                assert_eq!(cfg.value("database").unwrap(), Value::from("sqlite"));
                assert_eq!(cfg.value("user").unwrap(), Value::from("admin"));
                assert!(cfg.get("database.port").is_err());
            },
        );
    }

    #[test]
    fn test_layered_loader() {
        let defaults: Map = vec![
            ("name", Value::from("default")),
            ("port", Value::from(80)),
            ("debug", Value::from(false)),
        ]
        .into_iter()
        .collect();
        let file = temp_file(".yaml", "name: from-file\nport: 8080\n");

        temp_env::with_var("PCTEST_LAYERED_PORT", Some("9090"), || {
            let cfg = ConfigLoader::new()
                .name("layered")
                .defaults(defaults.clone())
                .file(file.path())
                .optional_file("/nonexistent/override.toml")
                .string("{\"debug\": true}", "json")
                .env(EnvSource::prefixed("PCTEST_LAYERED_").convert("port", polyconf_types::Conversion::Int))
                .load()
                .unwrap();

            assert_eq!(cfg.name(), Some("layered"));
            assert_eq!(cfg.value("name").unwrap(), Value::from("from-file"));
            assert_eq!(cfg.value("port").unwrap(), Value::Integer(9090));
            assert_eq!(cfg.value("debug").unwrap(), Value::Bool(true));
            assert_eq!(
                cfg.get_source("port").unwrap(),
                "PCTEST_LAYERED_PORT (environment variable)"
            );
        });

        let missing = ConfigLoader::new().file("/nonexistent/required.toml").load();
        assert!(matches!(missing, Err(PolyconfError::Io { .. })));
    }
}
