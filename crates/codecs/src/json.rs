//! JSON codec

use crate::registry::Codec;
use polyconf_types::{CodecError, Value};

const FORMAT: &str = "json";

/// Reads and writes JSON documents, keeping object key order
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn read(&self, text: &str) -> Result<Value, CodecError> {
        let document: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CodecError::parse(FORMAT, e))?;
        Ok(Value::from(document))
    }

    fn write(&self, value: &Value, pretty: bool) -> Result<String, CodecError> {
        let written = if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        written.map_err(|e| CodecError::serialize(FORMAT, e))
    }
}
