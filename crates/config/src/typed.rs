//! Plain, serialized and typed views of a section

use crate::entry::Node;
use crate::path::KeyPath;
use crate::section::Section;
use chrono::{NaiveDate, NaiveDateTime};
use figment::{providers::Serialized, Figment};
use polyconf_codecs::CodecRegistry;
use polyconf_types::{convert, ConfigError, ConversionError, Map, PolyconfError, Result, Value};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// An immutable record built from the immediate children of a section
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={}", value.repr()))
            .collect();
        write!(f, "{}({})", self.name, fields.join(", "))
    }
}

impl Section {
    /// Nested plain value; list sections become lists
    pub fn as_dict(&self) -> Value {
        if self.is_list {
            Value::List(self.children.iter().map(|(_, node)| node.to_value()).collect())
        } else {
            Value::Map(
                self.children
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_value()))
                    .collect::<Map>(),
            )
        }
    }

    /// Serialize with a codec from the global registry
    pub fn as_str(&self, format: &str) -> Result<String> {
        self.as_str_with(CodecRegistry::global(), format, false)
    }

    /// Serialize with a codec from the global registry, laid out for humans
    pub fn as_str_pretty(&self, format: &str) -> Result<String> {
        self.as_str_with(CodecRegistry::global(), format, true)
    }

    pub fn as_str_with(&self, registry: &CodecRegistry, format: &str, pretty: bool) -> Result<String> {
        Ok(registry.write(format, &self.as_dict(), pretty)?)
    }

    /// Record holding exactly the immediate children, in insertion order
    pub fn as_named_tuple(&self, name: &str) -> Record {
        Record {
            name: name.to_string(),
            fields: self
                .children
                .iter()
                .map(|(key, node)| (key.clone(), node.to_value()))
                .collect(),
        }
    }

    /// Record with exactly the given fields
    ///
    /// Every absent field is reported in one error. Children that are not
    /// listed in `fields` are reported as unexpected.
    pub fn as_named_tuple_with_fields(&self, name: &str, fields: &[&str]) -> Result<Record> {
        let missing: Vec<String> = fields
            .iter()
            .filter(|field| !self.contains_key(field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingField {
                record: name.to_string(),
                missing,
                sources: self.sources_string(),
            }
            .into());
        }

        let unexpected: Vec<String> = self
            .children
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !fields.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(ConfigError::UnexpectedField {
                record: name.to_string(),
                unexpected,
                sources: self.sources_string(),
            }
            .into());
        }

        Ok(Record {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|field| {
                    let value = self.child(field).map(Node::to_value).unwrap_or_default();
                    (field.to_string(), value)
                })
                .collect(),
        })
    }

    /// Deserialize the section into any serde type
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        Figment::from(Serialized::defaults(self.as_dict()))
            .extract()
            .map_err(|err| {
                let section = if self.path.is_empty() {
                    "root".to_string()
                } else {
                    self.dotted_path()
                };
                ConfigError::Extract {
                    section,
                    message: err.to_string(),
                }
                .into()
            })
    }

    // Typed accessors

    pub fn to_str(&self, path: impl Into<KeyPath>) -> Result<String> {
        Ok(match self.value(path)? {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }

    pub fn to_int(&self, path: impl Into<KeyPath>) -> Result<i64> {
        match self.value(path)? {
            Value::Integer(i) => Ok(i),
            Value::String(text) => Ok(convert::to_int(&text)?),
            other => Err(mismatch(&other, "int")),
        }
    }

    pub fn to_float(&self, path: impl Into<KeyPath>) -> Result<f64> {
        match self.value(path)? {
            Value::String(text) => Ok(convert::to_float(&text)?),
            other => other.as_f64().ok_or_else(|| mismatch(&other, "float")),
        }
    }

    pub fn to_bool(&self, path: impl Into<KeyPath>) -> Result<bool> {
        match self.value(path)? {
            Value::Bool(b) => Ok(b),
            Value::Integer(i) => Ok(convert::to_bool(&i.to_string())?),
            Value::String(text) => Ok(convert::to_bool(&text)?),
            other => Err(mismatch(&other, "bool")),
        }
    }

    pub fn to_date(&self, path: impl Into<KeyPath>) -> Result<NaiveDate> {
        match self.value(path)? {
            Value::String(text) => Ok(convert::to_date(&text)?),
            other => Err(mismatch(&other, "date")),
        }
    }

    pub fn to_datetime(&self, path: impl Into<KeyPath>) -> Result<NaiveDateTime> {
        match self.value(path)? {
            Value::String(text) => Ok(convert::to_datetime(&text)?),
            other => Err(mismatch(&other, "datetime")),
        }
    }

    /// Path value with `~` expanded
    pub fn to_path(&self, path: impl Into<KeyPath>) -> Result<PathBuf> {
        match self.value(path)? {
            Value::String(text) => Ok(convert::to_path(&text)),
            other => Err(mismatch(&other, "path")),
        }
    }

    /// List value; text is split on whitespace and commas
    pub fn to_list(&self, path: impl Into<KeyPath>) -> Result<Vec<Value>> {
        match self.get(path)?.to_value() {
            Value::List(items) => Ok(items),
            Value::String(text) => Ok(convert::split_items(&text)
                .into_iter()
                .map(Value::String)
                .collect()),
            other => Err(mismatch(&other, "list")),
        }
    }

    pub fn to_set(&self, path: impl Into<KeyPath>) -> Result<BTreeSet<String>> {
        Ok(self
            .to_list(path)?
            .iter()
            .map(Value::to_string)
            .collect())
    }

    /// Mapping value; text is read as `key: value` items
    pub fn to_dict(&self, path: impl Into<KeyPath>) -> Result<Map> {
        match self.get(path)?.to_value() {
            Value::Map(map) => Ok(map),
            Value::String(text) => Ok(convert::to_dict(&text)?),
            other => Err(mismatch(&other, "dict")),
        }
    }
}

fn mismatch(value: &Value, target: &str) -> PolyconfError {
    ConversionError::invalid(
        &value.to_string(),
        target,
        format!("{} values can not be converted", value.type_name()),
    )
    .into()
}
