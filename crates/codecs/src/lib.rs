//! Configuration file codecs
//!
//! Each supported format is a [`Codec`]: a reader from text to a [`Value`]
//! tree and a writer back to text. Codecs are compiled in through cargo
//! features and looked up through a [`CodecRegistry`].
//!
//! [`Value`]: polyconf_types::Value

pub mod registry;

#[cfg(feature = "ini")]
pub mod ini;
#[cfg(feature = "json")]
pub mod json;
#[cfg(feature = "toml")]
pub mod toml;
#[cfg(feature = "yaml")]
pub mod yaml;

pub use registry::{Codec, CodecRegistry, KNOWN_FORMATS};
