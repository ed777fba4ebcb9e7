//! INI codec
//!
//! Layout accepted by the reader:
//!
//! ```ini
//! title = top-level keys come before any section
//!
//! [DEFAULT]
//! user = admin
//!
//! [database.primary]
//! port = 5432
//! port:type = int
//! description = indented lines continue
//!     the previous value
//! ```
//!
//! Section headers with dots nest. Keys of the `DEFAULT` section are
//! inherited by every other section that does not set them, and the section
//! itself is not part of the result. Values are text unless a `key:type`
//! annotation names a conversion for them. The writer emits those
//! annotations for numbers and booleans and falls back to JSON for values
//! INI cannot hold as plain text.

use crate::registry::Codec;
use polyconf_types::{CodecError, Conversion, Map, Value};

const FORMAT: &str = "ini";
const DEFAULT_SECTION: &str = "DEFAULT";
const TYPE_MARKER: &str = "type";

/// Reads and writes INI documents
#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

#[derive(Debug)]
struct RawSection {
    name: Option<String>,
    entries: Vec<(String, String)>,
}

impl RawSection {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }
}

impl Codec for IniCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ini", "cfg", "conf"]
    }

    fn read(&self, text: &str) -> Result<Value, CodecError> {
        build(parse(text)?)
    }

    fn write(&self, value: &Value, _pretty: bool) -> Result<String, CodecError> {
        let map = value.as_map().ok_or_else(|| {
            CodecError::serialize(
                FORMAT,
                format!("top level must be a map, not {}", value.type_name()),
            )
        })?;

        let mut out = String::new();
        write_entries(&mut out, map)?;
        write_sections(&mut out, &[], map)?;
        Ok(out)
    }
}

fn parse(text: &str) -> Result<Vec<RawSection>, CodecError> {
    let mut sections = Vec::new();
    let mut current = RawSection::new(None);
    let mut continuing = false;

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continuing = false;
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if continuing && line.starts_with(char::is_whitespace) {
            if let Some((_, value)) = current.entries.last_mut() {
                value.push('\n');
                value.push_str(trimmed);
            }
            continue;
        }

        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let next = RawSection::new(Some(header.trim().to_string()));
            sections.push(std::mem::replace(&mut current, next));
            continuing = false;
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            CodecError::parse(
                FORMAT,
                format!(
                    "line {}: expected 'key = value' or '[section]', found {trimmed:?}",
                    index + 1
                ),
            )
        })?;
        current
            .entries
            .push((key.trim().to_string(), value.trim().to_string()));
        continuing = true;
    }

    sections.push(current);
    Ok(sections)
}

fn build(sections: Vec<RawSection>) -> Result<Value, CodecError> {
    let defaults: Vec<(String, String)> = sections
        .iter()
        .filter(|section| section.name.as_deref() == Some(DEFAULT_SECTION))
        .flat_map(|section| section.entries.iter().cloned())
        .collect();

    let mut root = Map::new();
    for section in sections {
        let name = match section.name {
            Some(name) if name == DEFAULT_SECTION => continue,
            Some(name) => name,
            None => {
                root.extend(typed_entries(section.entries)?);
                continue;
            }
        };

        let mut entries = section.entries;
        for (key, value) in &defaults {
            if !entries.iter().any(|(existing, _)| existing == key) {
                entries.push((key.clone(), value.clone()));
            }
        }

        let path: Vec<&str> = name.split('.').map(str::trim).collect();
        let target = section_map(&mut root, &path)?;
        target.extend(typed_entries(entries)?);
    }

    Ok(Value::Map(root))
}

/// Collect raw entries, then apply and drop `key:type` annotations
fn typed_entries(entries: Vec<(String, String)>) -> Result<Map, CodecError> {
    let mut values: Map = entries.into_iter().collect();

    let annotations: Vec<(String, String, String)> = values
        .iter()
        .filter_map(|(key, value)| {
            let (target, marker) = key.rsplit_once(':')?;
            let target = target.trim();
            (marker.trim() == TYPE_MARKER && values.contains_key(target)).then(|| {
                (
                    key.to_string(),
                    target.to_string(),
                    value.as_str().unwrap_or_default().to_string(),
                )
            })
        })
        .collect();

    for (annotation, target, conversion) in annotations {
        values.remove(&annotation);
        let conversion: Conversion = conversion
            .parse()
            .map_err(|e| CodecError::parse(FORMAT, format!("{annotation}: {e}")))?;
        let text = values
            .get(&target)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let converted = conversion
            .apply(&text)
            .map_err(|e| CodecError::parse(FORMAT, format!("{target}: {e}")))?;
        values.insert(target, converted);
    }

    Ok(values)
}

fn section_map<'a>(root: &'a mut Map, path: &[&str]) -> Result<&'a mut Map, CodecError> {
    let mut current = root;
    for name in path {
        if !current.contains_key(name) {
            current.insert(*name, Map::new());
        }
        current = match current.get_mut(name) {
            Some(Value::Map(map)) => map,
            _ => {
                return Err(CodecError::parse(
                    FORMAT,
                    format!("section [{}] conflicts with a value", path.join(".")),
                ))
            }
        };
    }
    Ok(current)
}

fn is_plain(text: &str) -> bool {
    !text.contains(['\n', '\r']) && text.trim() == text
}

/// Refuse keys the reader would parse back as something else
fn check_key(key: &str) -> Result<(), CodecError> {
    let marker = key.rsplit_once(':').map(|(_, marker)| marker.trim());
    if key.trim() != key
        || key.contains(['=', '\n', '\r'])
        || key.starts_with(['#', ';', '['])
        || marker == Some(TYPE_MARKER)
    {
        return Err(CodecError::serialize(
            FORMAT,
            format!("key {key:?} can not be written as INI"),
        ));
    }
    Ok(())
}

/// Dots in a header nest and `DEFAULT` is inherited, so neither can name a section
fn check_section(name: &str) -> Result<(), CodecError> {
    if name.trim() != name
        || name.contains(['.', '[', ']', '\n', '\r'])
        || name == DEFAULT_SECTION
    {
        return Err(CodecError::serialize(
            FORMAT,
            format!("section name {name:?} can not be written as INI"),
        ));
    }
    Ok(())
}

fn write_entries(out: &mut String, map: &Map) -> Result<(), CodecError> {
    for (key, value) in map.iter() {
        let (text, conversion) = match value {
            Value::Map(_) => continue,
            Value::String(s) if is_plain(s) => (s.clone(), None),
            Value::Integer(i) => (i.to_string(), Some(Conversion::Int)),
            Value::Float(_) => (value.to_string(), Some(Conversion::Float)),
            Value::Bool(b) => (b.to_string(), Some(Conversion::Bool)),
            other => (
                serde_json::to_string(other).map_err(|e| CodecError::serialize(FORMAT, e))?,
                Some(Conversion::Json),
            ),
        };

        check_key(key)?;
        out.push_str(&format!("{key} = {text}\n"));
        if let Some(conversion) = conversion {
            out.push_str(&format!("{key}:{TYPE_MARKER} = {conversion}\n"));
        }
    }
    Ok(())
}

fn write_sections<'a>(
    out: &mut String,
    prefix: &[&'a str],
    map: &'a Map,
) -> Result<(), CodecError> {
    for (key, value) in map.iter() {
        let Value::Map(section) = value else {
            continue;
        };
        check_section(key)?;

        let mut path = prefix.to_vec();
        path.push(key);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", path.join(".")));
        write_entries(out, section)?;
        write_sections(out, &path, section)?;
    }
    Ok(())
}
