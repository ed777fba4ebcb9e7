//! The root of a configuration tree

use crate::entry::Node;
use crate::section::Section;
use polyconf_types::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::debug;

const DEFAULT_INDENT: usize = 2;
const DEFAULT_KEY_WIDTH: usize = 20;

/// A named configuration tree
///
/// Dereferences to its root [`Section`], so navigation, enumeration and
/// mutation are called directly on the configuration. `vars` holds extra
/// replacement variables used when interpolating.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    name: Option<String>,
    root: Section,
    vars: Map,
}

impl Configuration {
    /// Create an empty, unnamed configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty configuration with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with_name(name)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub fn into_root(self) -> Section {
        self.root
    }

    /// Registered replacement variables
    pub fn vars(&self) -> &Map {
        &self.vars
    }

    /// Register a replacement variable for interpolation
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name, value);
    }

    /// Merge another configuration into this one, including its variables
    pub fn merge_with(&mut self, other: &Configuration, update: bool) {
        debug!(
            name = ?self.name,
            other = ?other.name,
            update,
            "Merging configurations"
        );
        self.root.merge_with(&other.root, update);
        for (name, value) in other.vars.iter() {
            if update || !self.vars.contains_key(name) {
                self.vars.insert(name, value.clone());
            }
        }
    }

    /// Human readable, TOML-like rendering
    pub fn as_pretty_str(&self, indent: usize, key_width: usize) -> String {
        self.root.render(self.name.as_deref(), indent, key_width)
    }
}

impl From<Section> for Configuration {
    fn from(mut section: Section) -> Self {
        section.rebase(Vec::new());
        Self {
            root: section,
            ..Self::default()
        }
    }
}

impl Deref for Configuration {
    type Target = Section;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

impl DerefMut for Configuration {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.root
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_pretty_str(DEFAULT_INDENT, DEFAULT_KEY_WIDTH))
    }
}

impl Section {
    pub(crate) fn render(&self, header: Option<&str>, indent: usize, key_width: usize) -> String {
        let mut lines: Vec<String> = header.map(|h| format!("[{h}]")).into_iter().collect();

        if self.is_list {
            let name = self.dotted_path();
            for (_, node) in &self.children {
                lines.push(format!("\n[[{name}]]"));
                match node {
                    Node::Section(element) => {
                        lines.push(element.render(None, indent, key_width));
                    }
                    Node::Entry(entry) => lines.push(render_value(entry.value())),
                }
            }
            return lines.join("\n").trim().to_string();
        }

        for (key, node) in &self.children {
            match node {
                Node::Section(section) => {
                    let header = (!section.is_list).then(|| section.dotted_path());
                    let rendered = section.render(header.as_deref(), indent, key_width);
                    lines.push(format!("\n{}", indent_lines(&rendered, indent)));
                }
                Node::Entry(entry) => lines.push(format!(
                    "{key:<key_width$} = {}",
                    render_value(entry.value())
                )),
            }
        }
        lines.join("\n")
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.contains('\n') => format!("\"\"\"\n{s}\"\"\""),
        other => other.repr(),
    }
}

fn indent_lines(text: &str, indent: usize) -> String {
    let padding = " ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{padding}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_configuration() {
        let mut cfg = Configuration::named("settings");
        cfg.update_entry("answer", 42, None).unwrap();

        assert_eq!(cfg.name(), Some("settings"));
        assert_eq!(cfg.value("answer").unwrap(), Value::Integer(42));
        assert!(Configuration::new().is_empty());
    }

    #[test]
    fn test_merge_includes_vars() {
        let mut cfg = Configuration::new();
        cfg.set_var("root", "/tmp");
        let mut other = Configuration::new();
        other.set_var("root", "/home");
        other.set_var("user", "admin");

        cfg.merge_with(&other, false);
        assert_eq!(cfg.vars().get("root"), Some(&Value::from("/tmp")));
        assert_eq!(cfg.vars().get("user"), Some(&Value::from("admin")));
    }

    #[test]
    fn test_display() {
        let mut cfg = Configuration::named("sample");
        cfg.update_entry("name", "polyconf", None).unwrap();
        cfg.update_entry("author.firstname", "Geir Arne", None).unwrap();
        cfg.update_entry("versions", vec![1, 2], None).unwrap();

        let expected = "\
[sample]
name                 = \"polyconf\"

  [author]
  firstname            = \"Geir Arne\"
versions             = [1, 2]";
        assert_eq!(cfg.to_string(), expected);
    }

    #[test]
    fn test_display_list_section() {
        let mut cfg = Configuration::new();
        let servers = Value::List(vec![
            Value::Map(vec![("host", "a")].into_iter().collect()),
            Value::Map(vec![("host", "b")].into_iter().collect()),
        ]);
        cfg.update_entry("servers", servers, None).unwrap();

        let rendered = cfg.as_pretty_str(2, 6);
        assert_eq!(
            rendered,
            "\n  [[servers]]\n  host   = \"a\"\n\n  [[servers]]\n  host   = \"b\""
        );
    }

    #[test]
    fn test_from_section_rebases_to_root() {
        let mut cfg = Configuration::new();
        cfg.update_entry("a.b.c", 1, None).unwrap();

        let sub = Configuration::from(cfg.section("a").unwrap().clone());
        assert!(sub.path().is_empty());
        assert_eq!(sub.section("b").unwrap().path(), ["b"]);
    }
}
