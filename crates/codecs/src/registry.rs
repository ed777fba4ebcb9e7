//! Codec registry: format names and file extensions to codecs

use polyconf_types::{CodecError, Value};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// A reader/writer pair for one configuration format
pub trait Codec: Send + Sync {
    /// Lowercase format name, e.g. `toml`
    fn name(&self) -> &'static str;

    /// File extensions handled by this codec, without the leading dot
    fn extensions(&self) -> &'static [&'static str];

    /// Parse a document. Multi-document formats use the first document.
    fn read(&self, text: &str) -> Result<Value, CodecError>;

    /// Serialize a value tree. `pretty` asks for human-oriented layout.
    fn write(&self, value: &Value, pretty: bool) -> Result<String, CodecError>;
}

/// Formats polyconf knows about: name, cargo feature providing it, extensions
pub const KNOWN_FORMATS: &[(&str, &str, &[&str])] = &[
    ("ini", "ini", &["ini", "cfg", "conf"]),
    ("json", "json", &["json"]),
    ("toml", "toml", &["toml"]),
    ("yaml", "yaml", &["yaml", "yml"]),
];

/// Lookup table of the codecs available to a process
pub struct CodecRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Create a registry holding every codec compiled into this build
    pub fn with_builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "ini")]
        registry.register(Box::new(crate::ini::IniCodec));
        #[cfg(feature = "json")]
        registry.register(Box::new(crate::json::JsonCodec));
        #[cfg(feature = "toml")]
        registry.register(Box::new(crate::toml::TomlCodec));
        #[cfg(feature = "yaml")]
        registry.register(Box::new(crate::yaml::YamlCodec));

        registry
    }

    /// Process-wide registry, populated once on first use
    pub fn global() -> &'static CodecRegistry {
        static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let registry = Self::with_builtin();
            debug!(formats = ?registry.names(), "Codec registry initialized");
            registry
        })
    }

    /// Add a codec, replacing any codec with the same name
    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.retain(|existing| existing.name() != codec.name());
        self.codecs.push(codec);
    }

    /// Names of the registered formats
    pub fn names(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|codec| codec.name()).collect()
    }

    /// Select a codec by format name (case-insensitive)
    pub fn get(&self, format: &str) -> Result<&dyn Codec, CodecError> {
        let format = format.trim().trim_start_matches('.').to_ascii_lowercase();
        if let Some(codec) = self.codecs.iter().find(|codec| codec.name() == format) {
            return Ok(codec.as_ref());
        }

        match KNOWN_FORMATS.iter().find(|(name, _, _)| *name == format) {
            Some((name, feature, _)) => Err(CodecError::FormatUnavailable {
                format: name.to_string(),
                feature: feature.to_string(),
            }),
            None => Err(CodecError::UnknownFormat { format }),
        }
    }

    /// Guess the format of a file from its extension
    pub fn guess_format(&self, path: &Path) -> Result<&'static str, CodecError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let registered = self
            .codecs
            .iter()
            .find(|codec| codec.extensions().contains(&extension.as_str()));
        if let Some(codec) = registered {
            return Ok(codec.name());
        }

        match KNOWN_FORMATS
            .iter()
            .find(|(_, _, extensions)| extensions.contains(&extension.as_str()))
        {
            Some((name, feature, _)) => Err(CodecError::FormatUnavailable {
                format: name.to_string(),
                feature: feature.to_string(),
            }),
            None => Err(CodecError::UndetectableFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// Parse text with the named codec
    pub fn read(&self, format: &str, text: &str) -> Result<Value, CodecError> {
        self.get(format)?.read(text)
    }

    /// Serialize a value with the named codec
    pub fn write(&self, format: &str, value: &Value, pretty: bool) -> Result<String, CodecError> {
        self.get(format)?.write(value, pretty)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperCodec;

    impl Codec for UpperCodec {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["up"]
        }

        fn read(&self, text: &str) -> Result<Value, CodecError> {
            Ok(Value::from(text.to_uppercase()))
        }

        fn write(&self, value: &Value, _pretty: bool) -> Result<String, CodecError> {
            Ok(value.to_string().to_uppercase())
        }
    }

    #[test]
    fn test_builtin_formats() {
        let registry = CodecRegistry::with_builtin();
        for format in ["ini", "json", "toml", "yaml"] {
            assert!(registry.get(format).is_ok(), "missing codec {format}");
        }
        assert!(registry.get("TOML").is_ok());
    }

    #[test]
    fn test_unknown_format() {
        let registry = CodecRegistry::with_builtin();
        let result = registry.get("xml");
        assert!(matches!(result, Err(CodecError::UnknownFormat { format }) if format == "xml"));
    }

    #[test]
    fn test_known_format_without_codec_is_unavailable() {
        let registry = CodecRegistry::new();
        let result = registry.get("yaml");
        assert!(matches!(
            result,
            Err(CodecError::FormatUnavailable { format, feature }) if format == "yaml" && feature == "yaml"
        ));

        let result = registry.guess_format(Path::new("settings.toml"));
        assert!(matches!(result, Err(CodecError::FormatUnavailable { .. })));
    }

    #[test]
    fn test_guess_format() {
        let registry = CodecRegistry::with_builtin();
        assert_eq!(registry.guess_format(Path::new("a/b.cfg")).unwrap(), "ini");
        assert_eq!(registry.guess_format(Path::new("b.conf")).unwrap(), "ini");
        assert_eq!(registry.guess_format(Path::new("b.JSON")).unwrap(), "json");
        assert_eq!(registry.guess_format(Path::new("b.yml")).unwrap(), "yaml");
        assert!(matches!(
            registry.guess_format(Path::new("README")),
            Err(CodecError::UndetectableFormat { .. })
        ));
    }

    #[test]
    fn test_register_custom_codec() {
        let mut registry = CodecRegistry::new();
        registry.register(Box::new(UpperCodec));
        registry.register(Box::new(UpperCodec));

        assert_eq!(registry.names(), vec!["upper"]);
        assert_eq!(registry.read("upper", "abc").unwrap(), Value::from("ABC"));
        assert_eq!(
            registry.guess_format(Path::new("x.up")).unwrap(),
            "upper"
        );
    }

    #[test]
    fn test_global_registry_is_shared() {
        let first = CodecRegistry::global() as *const CodecRegistry;
        let second = CodecRegistry::global() as *const CodecRegistry;
        assert_eq!(first, second);
    }
}
