//! Shared types for the Polyconf system
//!
//! This crate contains the format-independent value model, the error taxonomy
//! and the string conversions used by the codecs and the configuration tree.

pub mod convert;
pub mod error;
pub mod utils;
pub mod value;

// Re-export commonly used types
pub use convert::Conversion;
pub use error::{CodecError, ConfigError, ConversionError, PolyconfError, Result};
pub use value::{Map, Value};
