//! Environment variables as a configuration source

use crate::path::KeyPath;
use figment::providers::Env;
use polyconf_types::{Conversion, Value};
use std::collections::HashMap;
use tracing::warn;

/// Separator between nesting levels in variable names
pub const DEFAULT_SEPARATOR: &str = "__";

/// Which environment variables to read and where to put them
///
/// Variables are discovered by prefix (`APP_DATABASE__PORT` becomes
/// `database.port`) or mapped explicitly to a key path. Conversions are keyed
/// by the dotted path a variable ends up at.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: Option<String>,
    separator: String,
    mappings: Vec<(String, KeyPath)>,
    conversions: HashMap<String, Conversion>,
}

/// One variable resolved to a key path
#[derive(Debug, Clone, PartialEq)]
pub struct EnvValue {
    pub path: KeyPath,
    pub value: Value,
    pub source: String,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self {
            prefix: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            mappings: Vec::new(),
            conversions: HashMap::new(),
        }
    }
}

impl EnvSource {
    /// Source without any variables; add mappings to read some
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every variable starting with `prefix`
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Read `var` into `path`
    pub fn map(mut self, var: impl Into<String>, path: impl Into<KeyPath>) -> Self {
        self.mappings.push((var.into(), path.into()));
        self
    }

    /// Convert the text of the variable ending up at `path`
    pub fn convert(mut self, path: impl Into<KeyPath>, conversion: Conversion) -> Self {
        self.conversions.insert(path.into().to_string(), conversion);
        self
    }

    /// Collect the variables present in the environment, sorted by path
    ///
    /// A variable whose conversion fails is skipped.
    pub fn values(&self) -> Vec<EnvValue> {
        let mut found: Vec<(KeyPath, String, String)> = Vec::new();

        if let Some(prefix) = &self.prefix {
            let env = if self.separator.is_empty() {
                Env::prefixed(prefix)
            } else {
                Env::prefixed(prefix).split(self.separator.as_str())
            };
            for (key, text) in env.iter() {
                let path = KeyPath::parse(&key.as_str().to_ascii_lowercase());
                let name = key.as_str().replace('.', &self.separator);
                let var = format!("{prefix}{}", name.to_ascii_uppercase());
                found.push((path, var, text));
            }
        }

        if !self.mappings.is_empty() {
            let names: Vec<&str> = self.mappings.iter().map(|(var, _)| var.as_str()).collect();
            let present: Vec<_> = Env::raw().only(&names).iter().collect();
            for (var, path) in &self.mappings {
                let text = present
                    .iter()
                    .find(|(key, _)| key.as_str().eq_ignore_ascii_case(var))
                    .map(|(_, text)| text.clone());
                if let Some(text) = text {
                    found.push((path.clone(), var.clone(), text));
                }
            }
        }

        found.sort_by(|(a, _, _), (b, _, _)| a.components().cmp(b.components()));
        found
            .into_iter()
            .filter_map(|(path, var, text)| {
                let value = match self.conversions.get(&path.to_string()) {
                    Some(conversion) => match conversion.apply(&text) {
                        Ok(value) => value,
                        Err(err) => {
                            warn!(
                                var = %var,
                                conversion = %conversion,
                                error = %err,
                                "Skipping environment variable"
                            );
                            return None;
                        }
                    },
                    None => Value::String(text),
                };
                Some(EnvValue {
                    path,
                    value,
                    source: format!("{var} (environment variable)"),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_discovery() {
        temp_env::with_vars(
            [
                ("PCTEST_DISCOVER_NAME", Some("polyconf")),
                ("PCTEST_DISCOVER_DATABASE__PORT", Some("5432")),
                ("PCTEST_DISCOVER_DATABASE__USER_NAME", Some("admin")),
            ],
            || {
                let values = EnvSource::prefixed("PCTEST_DISCOVER_").values();
                let paths: Vec<String> = values.iter().map(|v| v.path.to_string()).collect();
                assert_eq!(paths, vec!["database.port", "database.user_name", "name"]);
                assert_eq!(values[0].value, Value::from("5432"));
                assert_eq!(
                    values[0].source,
                    "PCTEST_DISCOVER_DATABASE__PORT (environment variable)"
                );
            },
        );
    }

    #[test]
    fn test_conversions_and_failures() {
        temp_env::with_vars(
            [
                ("PCTEST_CONVERT_PORT", Some("5432")),
                ("PCTEST_CONVERT_DEBUG", Some("maybe")),
            ],
            || {
                let values = EnvSource::prefixed("PCTEST_CONVERT_")
                    .convert("port", Conversion::Int)
                    .convert("debug", Conversion::Bool)
                    .values();
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].path, KeyPath::parse("port"));
                assert_eq!(values[0].value, Value::Integer(5432));
            },
        );
    }

    #[test]
    fn test_explicit_mapping() {
        temp_env::with_vars(
            [
                ("PCTEST_MAPPED_HOME", Some("/home/user")),
                ("PCTEST_MAPPED_UNSET", None),
            ],
            || {
                let values = EnvSource::new()
                    .map("PCTEST_MAPPED_HOME", "paths.home")
                    .map("PCTEST_MAPPED_UNSET", "paths.other")
                    .values();
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].path, KeyPath::parse("paths.home"));
                assert_eq!(values[0].source, "PCTEST_MAPPED_HOME (environment variable)");
            },
        );
    }
}
