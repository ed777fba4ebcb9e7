//! Unified configuration for the Polyconf system
//!
//! This crate reads INI, JSON, TOML and YAML documents and environment
//! variables into one nested [`Configuration`] with dotted key access,
//! provenance for every value, `{name}` interpolation and typed views.

pub mod configuration;
pub mod entry;
pub mod env;
pub mod interpolation;
pub mod loader;
pub mod path;
pub mod section;
pub mod typed;

pub use configuration::Configuration;
pub use entry::{Entry, Node};
pub use env::{EnvSource, EnvValue};
pub use interpolation::{Converter, Variables};
pub use loader::ConfigLoader;
pub use path::KeyPath;
pub use section::Section;
pub use typed::Record;

pub use polyconf_codecs::{Codec, CodecRegistry};
pub use polyconf_types::{
    CodecError, ConfigError, Conversion, ConversionError, Map, PolyconfError, Result, Value,
};
