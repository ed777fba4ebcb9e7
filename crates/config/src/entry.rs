//! Leaf entries and tree nodes

use crate::section::Section;
use polyconf_types::Value;

/// A leaf value together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub(crate) value: Value,
    pub(crate) source: Option<String>,
    pub(crate) section_path: Vec<String>,
}

impl Entry {
    pub fn new(value: impl Into<Value>, source: Option<&str>, section_path: Vec<String>) -> Self {
        Self {
            value: value.into(),
            source: source.map(str::to_string),
            section_path,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Reader or file the value was read from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Names of the sections enclosing this entry, from the root
    pub fn section_path(&self) -> &[String] {
        &self.section_path
    }
}

/// A child of a [`Section`]: either a leaf entry or a nested section
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Entry(Entry),
    Section(Section),
}

impl Node {
    /// Build the node for `value` stored as `key` below `parent`
    ///
    /// Mappings become sections, lists holding mappings or lists become list
    /// sections and everything else becomes a leaf entry.
    pub(crate) fn build(value: Value, parent: &[String], key: &str, source: Option<&str>) -> Self {
        let path = child_path(parent, key);
        match value {
            Value::Map(map) => {
                let mut section = Section::new(path);
                section.update_from_map(map, source);
                Node::Section(section)
            }
            Value::List(items) if items.iter().any(Value::is_nested) => {
                let mut section = Section::list(path);
                for (index, item) in items.into_iter().enumerate() {
                    let name = index.to_string();
                    let node = Node::build(item, &section.path, &name, source);
                    section.children.push((name, node));
                }
                Node::Section(section)
            }
            value => Node::Entry(Entry::new(value, source, parent.to_vec())),
        }
    }

    /// Plain value of the node, sections are converted recursively
    pub fn to_value(&self) -> Value {
        match self {
            Node::Entry(entry) => entry.value.clone(),
            Node::Section(section) => section.as_dict(),
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Node::Section(_))
    }

    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Node::Entry(entry) => Some(entry),
            Node::Section(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Node::Section(section) => Some(section),
            Node::Entry(_) => None,
        }
    }

    /// Move the node to `key` below `parent`, updating recorded paths
    pub(crate) fn rebase(&mut self, parent: &[String], key: &str) {
        match self {
            Node::Entry(entry) => entry.section_path = parent.to_vec(),
            Node::Section(section) => section.rebase(child_path(parent, key)),
        }
    }
}

impl From<Section> for Node {
    fn from(section: Section) -> Self {
        Node::Section(section)
    }
}

pub(crate) fn child_path(parent: &[String], key: &str) -> Vec<String> {
    let mut path = parent.to_vec();
    path.push(key.to_string());
    path
}
