//! Error types for the Polyconf system

use std::io;
use thiserror::Error;

/// Main error type for polyconf operations
#[derive(Error, Debug)]
pub enum PolyconfError {
    /// Navigation, shape and typed-view errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Format selection and parse/serialize errors
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// String conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A configuration file could not be read or written
    #[error("Could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A configuration file was read but its contents are unusable
    #[error("Invalid configuration file {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: CodecError,
    },
}

/// Result type alias for polyconf operations
pub type Result<T> = std::result::Result<T, PolyconfError>;

/// Configuration tree specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Path does not resolve
    #[error("Configuration has no entry '{path}'")]
    KeyResolution { path: String },

    /// Path addresses a leaf where a section was required
    #[error("'{path}' is not a section")]
    NotASection { path: String },

    /// Path addresses a section where a leaf was required
    #[error("'{path}' is not a leaf entry")]
    NotALeaf { path: String },

    /// Required record fields are absent
    #[error(
        "Configuration '{record}' is missing {} required field(s): {} ({sources})",
        .missing.len(),
        quoted(.missing)
    )]
    MissingField {
        record: String,
        missing: Vec<String>,
        sources: String,
    },

    /// Section holds fields the record does not declare
    #[error(
        "Configuration '{record}' got unexpected field(s): {} ({sources})",
        quoted(.unexpected)
    )]
    UnexpectedField {
        record: String,
        unexpected: Vec<String>,
        sources: String,
    },

    /// Typed extraction failed
    #[error("Could not extract '{section}': {message}")]
    Extract { section: String, message: String },
}

/// Codec specific errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// Format name is not known at all
    #[error("Unknown configuration format: {format}")]
    UnknownFormat { format: String },

    /// Format is known but its codec was not compiled in
    #[error("Format {format} is not available, enable the '{feature}' feature of polyconf")]
    FormatUnavailable { format: String, feature: String },

    /// No codec claims the file extension
    #[error("Could not guess format of {path}")]
    UndetectableFormat { path: String },

    /// Text is not a valid document of the format
    #[error("Could not parse {format} document: {message}")]
    Parse { format: String, message: String },

    /// Value cannot be written in the format
    #[error("Could not write {format} document: {message}")]
    Serialize { format: String, message: String },
}

/// String conversion specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Conversion name is not supported
    #[error("Conversion to {0} is not supported")]
    UnknownConversion(String),

    /// Text cannot be converted to the target type
    #[error("Value {value:?} can not be converted to {target}: {reason}")]
    InvalidValue {
        value: String,
        target: String,
        reason: String,
    },
}

impl CodecError {
    /// Build a parse error for the given format
    pub fn parse(format: &str, message: impl ToString) -> Self {
        CodecError::Parse {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    /// Build a serialization error for the given format
    pub fn serialize(format: &str, message: impl ToString) -> Self {
        CodecError::Serialize {
            format: format.to_string(),
            message: message.to_string(),
        }
    }
}

impl ConversionError {
    pub fn invalid(value: &str, target: &str, reason: impl ToString) -> Self {
        ConversionError::InvalidValue {
            value: value.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
