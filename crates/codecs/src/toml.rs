//! TOML codec

use crate::registry::Codec;
use polyconf_types::{CodecError, Map, Value};

const FORMAT: &str = "toml";

/// Reads and writes TOML documents
///
/// TOML datetimes are read as their text form. TOML has no null, so writing
/// a tree that contains one fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml"]
    }

    fn read(&self, text: &str) -> Result<Value, CodecError> {
        let table: ::toml::Table =
            ::toml::from_str(text).map_err(|e| CodecError::parse(FORMAT, e))?;
        Ok(from_table(table))
    }

    fn write(&self, value: &Value, pretty: bool) -> Result<String, CodecError> {
        let table = match to_toml(value)? {
            ::toml::Value::Table(table) => table,
            other => {
                return Err(CodecError::serialize(
                    FORMAT,
                    format!("top level must be a table, not {}", other.type_str()),
                ))
            }
        };
        let written = if pretty {
            ::toml::to_string_pretty(&table)
        } else {
            ::toml::to_string(&table)
        };
        written.map_err(|e| CodecError::serialize(FORMAT, e))
    }
}

fn from_table(table: ::toml::Table) -> Value {
    Value::Map(
        table
            .into_iter()
            .map(|(key, value)| (key, from_toml(value)))
            .collect::<Map>(),
    )
}

fn from_toml(value: ::toml::Value) -> Value {
    match value {
        ::toml::Value::String(s) => Value::String(s),
        ::toml::Value::Integer(i) => Value::Integer(i),
        ::toml::Value::Float(f) => Value::Float(f),
        ::toml::Value::Boolean(b) => Value::Bool(b),
        ::toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        ::toml::Value::Array(items) => Value::List(items.into_iter().map(from_toml).collect()),
        ::toml::Value::Table(table) => from_table(table),
    }
}

fn to_toml(value: &Value) -> Result<::toml::Value, CodecError> {
    let converted = match value {
        Value::Null => {
            return Err(CodecError::serialize(FORMAT, "null values are not supported"))
        }
        Value::Bool(b) => ::toml::Value::Boolean(*b),
        Value::Integer(i) => ::toml::Value::Integer(*i),
        Value::Float(f) => ::toml::Value::Float(*f),
        Value::String(s) => ::toml::Value::String(s.clone()),
        Value::List(items) => {
            ::toml::Value::Array(items.iter().map(to_toml).collect::<Result<_, _>>()?)
        }
        Value::Map(map) => {
            let mut table = ::toml::Table::new();
            for (key, value) in map.iter() {
                table.insert(key.to_string(), to_toml(value)?);
            }
            ::toml::Value::Table(table)
        }
    };
    Ok(converted)
}
