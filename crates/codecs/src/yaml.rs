//! YAML codec

use crate::registry::Codec;
use polyconf_types::{CodecError, Map, Value};
use serde::Deserialize;
use tracing::debug;

const FORMAT: &str = "yaml";

/// Reads and writes YAML documents
///
/// Only the first document of a multi-document stream is read. Non-string
/// mapping keys are converted to their text form and tags are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["yaml", "yml"]
    }

    fn read(&self, text: &str) -> Result<Value, CodecError> {
        let mut documents = serde_yaml::Deserializer::from_str(text);
        let Some(first) = documents.next() else {
            return Ok(Value::Null);
        };
        let document =
            serde_yaml::Value::deserialize(first).map_err(|e| CodecError::parse(FORMAT, e))?;
        if documents.next().is_some() {
            debug!("Ignoring trailing YAML documents");
        }
        Ok(from_yaml(document))
    }

    fn write(&self, value: &Value, _pretty: bool) -> Result<String, CodecError> {
        serde_yaml::to_string(value).map_err(|e| CodecError::serialize(FORMAT, e))
    }
}

fn from_yaml(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::List(items.into_iter().map(from_yaml).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Map(
            mapping
                .into_iter()
                .map(|(key, value)| (key_text(key), from_yaml(value)))
                .collect::<Map>(),
        ),
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn key_text(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}
