//! Conversions from configuration text to typed values
//!
//! Formats like INI and environment variables only carry text. These
//! conversions give such values a type, either on request (`to_int` on an
//! entry) or through annotations (`port:type = int` in INI files).

use crate::error::ConversionError;
use crate::utils::expand_home;
use crate::value::{Map, Value};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Format used when parsing dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when parsing date-times
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TRUE_WORDS: [&str; 4] = ["1", "true", "yes", "on"];
const FALSE_WORDS: [&str; 4] = ["0", "false", "no", "off"];

/// A named conversion from text to a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    Str,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    Path,
    List,
    Set,
    Tuple,
    Dict,
    Json,
}

impl Conversion {
    pub fn name(&self) -> &'static str {
        match self {
            Conversion::Str => "str",
            Conversion::Int => "int",
            Conversion::Float => "float",
            Conversion::Bool => "bool",
            Conversion::Date => "date",
            Conversion::DateTime => "datetime",
            Conversion::Path => "path",
            Conversion::List => "list",
            Conversion::Set => "set",
            Conversion::Tuple => "tuple",
            Conversion::Dict => "dict",
            Conversion::Json => "json",
        }
    }

    /// Convert text into a typed value
    ///
    /// Dates and paths have no dedicated [`Value`] variant; they are validated
    /// and normalized but stay text.
    pub fn apply(&self, text: &str) -> Result<Value, ConversionError> {
        let value = match self {
            Conversion::Str => Value::String(text.to_string()),
            Conversion::Int => Value::Integer(to_int(text)?),
            Conversion::Float => Value::Float(to_float(text)?),
            Conversion::Bool => Value::Bool(to_bool(text)?),
            Conversion::Date => Value::String(to_date(text)?.format(DATE_FORMAT).to_string()),
            Conversion::DateTime => {
                Value::String(to_datetime(text)?.format(DATETIME_FORMAT).to_string())
            }
            Conversion::Path => Value::String(to_path(text).display().to_string()),
            Conversion::List | Conversion::Tuple => Value::from(split_items(text)),
            Conversion::Set => {
                let mut items: Vec<String> = Vec::new();
                for item in split_items(text) {
                    if !items.contains(&item) {
                        items.push(item);
                    }
                }
                Value::from(items)
            }
            Conversion::Dict => Value::Map(to_dict(text)?),
            Conversion::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .map_err(|e| ConversionError::invalid(text, "json", e))?,
        };
        Ok(value)
    }
}

impl FromStr for Conversion {
    type Err = ConversionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let conversion = match name.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Conversion::Str,
            "int" | "integer" => Conversion::Int,
            "float" => Conversion::Float,
            "bool" | "boolean" => Conversion::Bool,
            "date" => Conversion::Date,
            "datetime" => Conversion::DateTime,
            "path" => Conversion::Path,
            "list" => Conversion::List,
            "set" => Conversion::Set,
            "tuple" => Conversion::Tuple,
            "dict" => Conversion::Dict,
            "json" => Conversion::Json,
            _ => return Err(ConversionError::UnknownConversion(name.to_string())),
        };
        Ok(conversion)
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn to_int(text: &str) -> Result<i64, ConversionError> {
    text.trim()
        .parse()
        .map_err(|e| ConversionError::invalid(text, "int", e))
}

pub fn to_float(text: &str) -> Result<f64, ConversionError> {
    text.trim()
        .parse()
        .map_err(|e| ConversionError::invalid(text, "float", e))
}

/// Accepts 0/1, false/true, no/yes and off/on in any case
pub fn to_bool(text: &str) -> Result<bool, ConversionError> {
    let word = text.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&word.as_str()) {
        Ok(false)
    } else {
        Err(ConversionError::invalid(
            text,
            "bool",
            "expected one of 0/1, false/true, no/yes, off/on",
        ))
    }
}

pub fn to_date(text: &str) -> Result<NaiveDate, ConversionError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|e| ConversionError::invalid(text, "date", e))
}

pub fn to_datetime(text: &str) -> Result<NaiveDateTime, ConversionError> {
    NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
        .map_err(|e| ConversionError::invalid(text, "datetime", e))
}

pub fn to_path(text: &str) -> PathBuf {
    expand_home(text.trim())
}

/// Split on runs of whitespace and commas, dropping empty items
pub fn split_items(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key: value` items separated by commas or newlines
pub fn to_dict(text: &str) -> Result<Map, ConversionError> {
    let mut map = Map::new();
    for item in text.split([',', '\n']) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (key, value) = item
            .split_once(':')
            .ok_or_else(|| ConversionError::invalid(item, "dict", "expected 'key: value'"))?;
        map.insert(key.trim(), value.trim());
    }
    Ok(map)
}
