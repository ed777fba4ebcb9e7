//! `{name}` placeholder interpolation
//!
//! Placeholders are replaced in one pass. Every binding is looked up in the
//! unresolved tree, so replaced text is never expanded again and the result
//! does not depend on the order entries are visited.

use crate::configuration::Configuration;
use crate::entry::Node;
use crate::path::KeyPath;
use crate::section::Section;
use polyconf_types::{Conversion, ConversionError, Map, Result, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{trace, warn};

/// Turns a bound value into the text substituted for its placeholder
pub type Converter =
    Box<dyn Fn(&Value) -> std::result::Result<String, ConversionError> + Send + Sync>;

/// Bindings and options for one interpolation pass
#[derive(Default)]
pub struct Variables {
    vars: Map,
    converters: HashMap<String, Converter>,
    default_text: Option<String>,
    dedent: bool,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable, taking precedence over everything in the configuration
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name, value);
        self
    }

    /// Format the value bound to `name` with a custom function
    pub fn converter<F>(mut self, name: impl Into<String>, converter: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<String, ConversionError> + Send + Sync + 'static,
    {
        self.converters.insert(name.into(), Box::new(converter));
        self
    }

    /// Format the value bound to `name` through a named conversion
    pub fn conversion(self, name: impl Into<String>, conversion: Conversion) -> Self {
        self.converter(name, move |value: &Value| {
            conversion.apply(&value.to_string()).map(|converted| converted.to_string())
        })
    }

    /// Text used for every placeholder without a binding
    pub fn default_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = Some(text.into());
        self
    }

    /// Remove common indentation before replacing a single entry
    pub fn dedent(mut self, dedent: bool) -> Self {
        self.dedent = dedent;
        self
    }
}

impl fmt::Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut converters: Vec<&String> = self.converters.keys().collect();
        converters.sort();
        f.debug_struct("Variables")
            .field("vars", &self.vars)
            .field("converters", &converters)
            .field("default_text", &self.default_text)
            .field("dedent", &self.dedent)
            .finish()
    }
}

impl Configuration {
    /// Return a copy with every `{name}` placeholder in text values replaced
    ///
    /// Names are looked up in `variables`, then in the registered vars, then
    /// among the leaves: a sibling in the same section, the full dotted path
    /// from the root, and finally the first leaf with that name. Placeholders
    /// without a binding are kept as they are.
    pub fn replace(&self, variables: &Variables) -> Configuration {
        let scope = Scope::new(self, variables);
        let mut resolved = self.clone();
        replace_section(&mut resolved, &scope);
        resolved
    }

    /// Replace placeholders in the text entry at `path`
    pub fn replace_entry(&self, path: impl Into<KeyPath>, variables: &Variables) -> Result<String> {
        let path = path.into();
        let value = self.value(&path)?;
        let text = value.as_str().ok_or_else(|| {
            ConversionError::invalid(
                &value.to_string(),
                "str",
                "only text entries can be interpolated",
            )
        })?;

        let text = if variables.dedent {
            dedent(text)
        } else {
            text.to_string()
        };
        let section_path = path
            .split_last()
            .map(|(_, parents)| parents.to_vec())
            .unwrap_or_default();
        Ok(Scope::new(self, variables).substitute(&text, &section_path))
    }
}

struct Scope<'a> {
    config: &'a Configuration,
    variables: &'a Variables,
    by_name: HashMap<&'a str, &'a Value>,
}

impl<'a> Scope<'a> {
    fn new(config: &'a Configuration, variables: &'a Variables) -> Self {
        let mut by_name = HashMap::new();
        collect_names(config, &mut by_name);
        Self {
            config,
            variables,
            by_name,
        }
    }

    fn lookup(&self, name: &str, section_path: &[String]) -> Option<Value> {
        if let Some(value) = self.variables.vars.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.config.vars().get(name) {
            return Some(value.clone());
        }

        let mut sibling = section_path.to_vec();
        sibling.extend(KeyPath::parse(name).components().iter().cloned());
        self.leaf(KeyPath::from(sibling))
            .or_else(|| self.leaf(KeyPath::parse(name)))
            .or_else(|| self.by_name.get(name).map(|value| (*value).clone()))
    }

    fn leaf(&self, path: KeyPath) -> Option<Value> {
        self.config.value(path).ok()
    }

    fn resolve(&self, name: &str, section_path: &[String]) -> Option<String> {
        let Some(value) = self.lookup(name, section_path) else {
            return self.variables.default_text.clone();
        };

        match self.variables.converters.get(name) {
            Some(converter) => match converter(&value) {
                Ok(text) => Some(text),
                Err(err) => {
                    warn!(
                        variable = name,
                        error = %err,
                        "Could not convert variable, keeping placeholder"
                    );
                    None
                }
            },
            None => Some(value.to_string()),
        }
    }

    fn substitute(&self, text: &str, section_path: &[String]) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let name_len = after
                .find(|c: char| !is_name_char(c))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            if name_len == 0 || !after[name_len..].starts_with('}') {
                out.push('{');
                rest = after;
                continue;
            }

            match self.resolve(name, section_path) {
                Some(replacement) => {
                    trace!(variable = name, replacement = %replacement, "Replaced placeholder");
                    out.push_str(&replacement);
                }
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[name_len + 1..];
        }

        out.push_str(rest);
        out
    }

    fn replace_value(&self, value: &Value, section_path: &[String]) -> Value {
        match value {
            Value::String(text) => Value::String(self.substitute(text, section_path)),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.replace_value(item, section_path))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn replace_section(section: &mut Section, scope: &Scope<'_>) {
    for (_, node) in &mut section.children {
        match node {
            Node::Section(child) => replace_section(child, scope),
            Node::Entry(entry) => {
                entry.value = scope.replace_value(&entry.value, &entry.section_path);
            }
        }
    }
}

/// First leaf for every simple name, depth first
fn collect_names<'a>(section: &'a Section, by_name: &mut HashMap<&'a str, &'a Value>) {
    for (name, node) in &section.children {
        match node {
            Node::Entry(entry) => {
                by_name.entry(name.as_str()).or_insert(&entry.value);
            }
            Node::Section(child) => collect_names(child, by_name),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut dedented = text
        .lines()
        .map(|line| line.get(margin..).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    if text.ends_with('\n') {
        dedented.push('\n');
    }
    dedented
}
