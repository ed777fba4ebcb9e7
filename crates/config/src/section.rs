//! Configuration tree: sections holding entries and nested sections

use crate::entry::{child_path, Entry, Node};
use crate::path::KeyPath;
use polyconf_types::utils::dotted;
use polyconf_types::{ConfigError, Map, Result, Value};
use std::collections::BTreeSet;

/// A named node of the configuration tree
///
/// Children keep their insertion order. A list section holds the elements
/// of a list containing mappings or lists, named `"0"`, `"1"`, and so on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub(crate) path: Vec<String>,
    pub(crate) children: Vec<(String, Node)>,
    pub(crate) is_list: bool,
}

impl Section {
    /// Create an empty section at `path`
    pub fn new(path: Vec<String>) -> Self {
        Self {
            path,
            children: Vec::new(),
            is_list: false,
        }
    }

    /// Create an empty list section at `path`
    pub fn list(path: Vec<String>) -> Self {
        Self {
            is_list: true,
            ..Self::new(path)
        }
    }

    /// Last component of the section's path, `None` for a root section
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    /// Section names from the root down to this section
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dotted form of [`Section::path`]
    pub fn dotted_path(&self) -> String {
        dotted(&self.path)
    }

    pub fn is_list(&self) -> bool {
        self.is_list
    }

    /// Number of immediate children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Immediate child by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// Insert a child, overwriting an existing one in place
    fn insert_child(&mut self, name: &str, node: Node) {
        match self.child_mut(name) {
            Some(existing) => *existing = node,
            None => self.children.push((name.to_string(), node)),
        }
    }

    // Navigation

    /// Resolve a path to a leaf value or a section
    ///
    /// Numeric components index list sections and list-valued entries. Any
    /// other component applied to a list section is applied to each element
    /// and the results are collected into a list.
    pub fn get(&self, path: impl Into<KeyPath>) -> Result<Node> {
        let path = path.into();
        resolve(self, path.components()).ok_or_else(|| {
            ConfigError::KeyResolution {
                path: qualified(&self.path, path.components()),
            }
            .into()
        })
    }

    /// Resolve a path to a plain value, falling back to `default`
    pub fn get_or(&self, path: impl Into<KeyPath>, default: impl Into<Value>) -> Value {
        match self.get(path) {
            Ok(node) => node.to_value(),
            Err(_) => default.into(),
        }
    }

    /// Resolve a path that must address a leaf
    pub fn value(&self, path: impl Into<KeyPath>) -> Result<Value> {
        let path = path.into();
        match self.get(&path)? {
            Node::Entry(entry) => Ok(entry.value),
            Node::Section(_) => Err(ConfigError::NotALeaf {
                path: qualified(&self.path, path.components()),
            }
            .into()),
        }
    }

    /// Borrow the node at `path` without list broadcasting
    pub fn node(&self, path: impl Into<KeyPath>) -> Option<&Node> {
        let path = path.into();
        let components = path.components();
        let mut current = self;
        let mut depth = 0;
        loop {
            let rest = &components[depth..];
            let span = child_spans(current, rest).next()?;
            let node = current.child(&dotted(&rest[..span]))?;
            depth += span;
            if depth == components.len() {
                return Some(node);
            }
            current = node.as_section()?;
        }
    }

    /// Borrow the sub-section at `path`
    pub fn section(&self, path: impl Into<KeyPath>) -> Result<&Section> {
        let path = path.into();
        let components = path.components();
        let mut current = self;
        let mut depth = 0;
        while depth < components.len() {
            let rest = &components[depth..];
            let Some(span) = child_spans(current, rest).next() else {
                return Err(ConfigError::KeyResolution {
                    path: qualified(&self.path, &components[..=depth]),
                }
                .into());
            };
            let name = dotted(&rest[..span]);
            depth += span;
            current = match current.child(&name) {
                Some(Node::Section(section)) => section,
                _ => {
                    return Err(ConfigError::NotASection {
                        path: qualified(&self.path, &components[..depth]),
                    }
                    .into())
                }
            };
        }
        Ok(current)
    }

    /// Mutably borrow the sub-section at `path`
    pub fn section_mut(&mut self, path: impl Into<KeyPath>) -> Result<&mut Section> {
        let path = path.into();
        let components = path.components();
        let base = self.path.clone();
        let mut current = self;
        let mut depth = 0;
        while depth < components.len() {
            let rest = &components[depth..];
            let Some(span) = child_spans(current, rest).next() else {
                return Err(ConfigError::KeyResolution {
                    path: qualified(&base, &components[..=depth]),
                }
                .into());
            };
            let name = dotted(&rest[..span]);
            depth += span;
            current = match current.child_mut(&name) {
                Some(Node::Section(section)) => section,
                _ => {
                    return Err(ConfigError::NotASection {
                        path: qualified(&base, &components[..depth]),
                    }
                    .into())
                }
            };
        }
        Ok(current)
    }

    // Enumeration

    /// Names of the immediate child sections
    pub fn section_names(&self) -> Vec<&str> {
        self.section_items().into_iter().map(|(name, _)| name).collect()
    }

    /// Immediate child sections with their names
    pub fn section_items(&self) -> Vec<(&str, &Section)> {
        self.children
            .iter()
            .filter_map(|(name, node)| node.as_section().map(|section| (name.as_str(), section)))
            .collect()
    }

    pub fn sections(&self) -> Vec<&Section> {
        self.section_items().into_iter().map(|(_, section)| section).collect()
    }

    /// Immediate leaf entries with their names
    pub fn entries(&self) -> Vec<(&str, &Entry)> {
        self.children
            .iter()
            .filter_map(|(name, node)| node.as_entry().map(|entry| (name.as_str(), entry)))
            .collect()
    }

    pub fn entry_keys(&self) -> Vec<&str> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }

    pub fn entry_values(&self) -> Vec<&Value> {
        self.entries()
            .into_iter()
            .map(|(_, entry)| entry.value())
            .collect()
    }

    /// All leaf entries, depth first, keyed by their dotted path below this section
    pub fn leafs(&self) -> Vec<(String, &Entry)> {
        let mut leafs = Vec::new();
        collect_leafs(self, &[], &mut leafs);
        leafs
    }

    pub fn leaf_keys(&self) -> Vec<String> {
        self.leafs().into_iter().map(|(key, _)| key).collect()
    }

    pub fn leaf_values(&self) -> Vec<&Value> {
        self.leafs()
            .into_iter()
            .map(|(_, entry)| entry.value())
            .collect()
    }

    /// Sources of every leaf below this section
    pub fn sources(&self) -> BTreeSet<String> {
        self.leafs()
            .into_iter()
            .filter_map(|(_, entry)| entry.source.clone())
            .collect()
    }

    /// Sources of every leaf, joined for use in messages
    pub fn sources_string(&self) -> String {
        self.sources().into_iter().collect::<Vec<_>>().join(", ")
    }

    /// Source of one child: the entry's source, or all sources of a section
    pub fn get_source(&self, name: &str) -> Result<String> {
        match self.child(name) {
            Some(Node::Entry(entry)) => Ok(entry.source.clone().unwrap_or_default()),
            Some(Node::Section(section)) => Ok(section.sources_string()),
            None => Err(ConfigError::KeyResolution {
                path: qualified(&self.path, &[name.to_string()]),
            }
            .into()),
        }
    }

    // Mutation

    /// Set the value at `path`, creating sections along the way
    ///
    /// Mappings are merged into an existing section at `path`.
    pub fn update_entry(
        &mut self,
        path: impl Into<KeyPath>,
        value: impl Into<Value>,
        source: Option<&str>,
    ) -> Result<()> {
        let path = path.into();
        let value = value.into();
        let Some((key, parents)) = path.split_last() else {
            return match value {
                Value::Map(map) => {
                    self.update_from_map(map, source);
                    Ok(())
                }
                _ => Err(ConfigError::NotALeaf {
                    path: self.dotted_path(),
                }
                .into()),
            };
        };

        self.ensure_section(parents)?.set_child(key, value, source);
        Ok(())
    }

    /// Set every key of `map` as a child of this section
    pub fn update_from_map(&mut self, map: Map, source: Option<&str>) {
        for (key, value) in map {
            self.set_child(&key, value, source);
        }
    }

    fn set_child(&mut self, key: &str, value: Value, source: Option<&str>) {
        let value = match value {
            Value::Map(map) => match self.child_mut(key) {
                Some(Node::Section(existing)) if !existing.is_list => {
                    existing.update_from_map(map, source);
                    return;
                }
                _ => Value::Map(map),
            },
            value => value,
        };
        let node = Node::build(value, &self.path, key, source);
        self.insert_child(key, node);
    }

    fn ensure_section(&mut self, components: &[String]) -> Result<&mut Section> {
        let mut current = self;
        for name in components {
            let path = child_path(&current.path, name);
            if !current.contains_key(name) {
                current.insert_child(name, Node::Section(Section::new(path.clone())));
            }
            current = match current.child_mut(name) {
                Some(Node::Section(section)) => section,
                _ => {
                    return Err(ConfigError::NotASection {
                        path: dotted(&path),
                    }
                    .into())
                }
            };
        }
        Ok(current)
    }

    /// Merge another section into this one
    ///
    /// Sections with the same name are merged recursively. When `update` is
    /// true other's leaves overwrite existing ones, otherwise only missing
    /// keys are added. List sections are merged as whole values.
    pub fn merge_with(&mut self, other: &Section, update: bool) {
        for (name, node) in &other.children {
            if let (Some(Node::Section(mine)), Node::Section(theirs)) = (self.child_mut(name), node) {
                if !mine.is_list && !theirs.is_list {
                    mine.merge_with(theirs, update);
                    continue;
                }
            }
            if !update && self.contains_key(name) {
                continue;
            }

            let mut node = node.clone();
            node.rebase(&self.path, name);
            self.insert_child(name, node);
        }
    }

    /// Copy the section at `from` to a sibling named `as_name`
    ///
    /// The copy is merged into an existing sibling of that name.
    pub fn copy_section(&mut self, from: impl Into<KeyPath>, as_name: &str) -> Result<()> {
        let from = from.into();
        let copied = self.section(&from)?.as_dict();
        let parents = from.split_last().map(|(_, parents)| parents).unwrap_or_default();
        let source = format!("Copy of {}", qualified(&self.path, from.components()));
        self.section_mut(parents)?
            .update_entry(KeyPath::from(vec![as_name]), copied, Some(&source))
    }

    /// Detach and return the node at `path`
    pub fn remove(&mut self, path: impl Into<KeyPath>) -> Result<Node> {
        let path = path.into();
        let missing = ConfigError::KeyResolution {
            path: qualified(&self.path, path.components()),
        };
        let components = path.components();
        let Some((parents, key)) = (0..components.len()).rev().find_map(|cut| {
            let key = dotted(&components[cut..]);
            let parent = self.section(&components[..cut]).ok()?;
            parent.contains_key(&key).then_some((&components[..cut], key))
        }) else {
            return Err(missing.into());
        };

        let parent = self.section_mut(parents)?;
        let index = parent
            .children
            .iter()
            .position(|(name, _)| *name == key)
            .ok_or(missing)?;
        Ok(parent.children.remove(index).1)
    }

    /// Move the section to `path`, updating the recorded paths below it
    pub(crate) fn rebase(&mut self, path: Vec<String>) {
        self.path = path;
        for (name, node) in &mut self.children {
            node.rebase(&self.path, name);
        }
    }
}

fn resolve(section: &Section, components: &[String]) -> Option<Node> {
    let Some(first) = components.first() else {
        return Some(Node::Section(section.clone()));
    };

    if section.is_list && first.parse::<usize>().is_err() {
        let values = section
            .children
            .iter()
            .map(|(_, node)| match node {
                Node::Section(element) => resolve(element, components).map(|n| n.to_value()),
                Node::Entry(entry) => resolve_value(&entry.value, components),
            })
            .collect::<Option<Vec<_>>>()?;
        let (name, parent) = section.path.split_last()?;
        return Some(Node::build(Value::List(values), parent, name, None));
    }

    child_spans(section, components).find_map(|span| {
        let rest = &components[span..];
        match section.child(&dotted(&components[..span]))? {
            Node::Section(child) => resolve(child, rest),
            Node::Entry(entry) => {
                let value = resolve_value(&entry.value, rest)?;
                Some(Node::Entry(Entry {
                    value,
                    ..entry.clone()
                }))
            }
        }
    })
}

/// Lengths of the leading runs of `components` that name a child
///
/// A single component comes first, then dotted joins from the longest down,
/// so child names containing dots stay reachable.
fn child_spans<'a>(
    section: &'a Section,
    components: &'a [String],
) -> impl Iterator<Item = usize> + 'a {
    std::iter::once(1)
        .chain((2..=components.len()).rev())
        .filter(move |&span| {
            span <= components.len() && section.contains_key(&dotted(&components[..span]))
        })
}

fn resolve_value(value: &Value, components: &[String]) -> Option<Value> {
    let Some((first, rest)) = components.split_first() else {
        return Some(value.clone());
    };
    let index = first.parse::<usize>().ok()?;
    resolve_value(value.as_list()?.get(index)?, rest)
}

fn collect_leafs<'a>(section: &'a Section, prefix: &[String], leafs: &mut Vec<(String, &'a Entry)>) {
    for (name, node) in &section.children {
        let path = child_path(prefix, name);
        match node {
            Node::Entry(entry) => leafs.push((dotted(&path), entry)),
            Node::Section(child) => collect_leafs(child, &path, leafs),
        }
    }
}

fn qualified(base: &[String], components: &[String]) -> String {
    dotted(&[base, components].concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Section {
        let mut root = Section::default();
        root.update_entry("name", "polyconf", Some("test")).unwrap();
        root.update_entry("author.firstname", "Geir Arne", Some("test"))
            .unwrap();
        root.update_entry("author.lastname", "Hjelle", Some("other"))
            .unwrap();
        root.update_entry("versions", vec![3.6, 3.7], None).unwrap();
        root
    }

    fn servers() -> Value {
        let first: Map = vec![("host", "a"), ("port", "80")].into_iter().collect();
        let second: Map = vec![("host", "b"), ("port", "81")].into_iter().collect();
        Value::List(vec![Value::Map(first), Value::Map(second)])
    }

    #[test]
    fn test_update_then_get() {
        let mut root = sample();
        root.update_entry("a.b.c", 42, None).unwrap();

        assert_eq!(root.get("a.b.c").unwrap().to_value(), Value::Integer(42));
        assert_eq!(root.value("name").unwrap(), Value::from("polyconf"));
        assert_eq!(root.get(["author", "lastname"]).unwrap().to_value(), Value::from("Hjelle"));
        assert_eq!(root.section("a.b").unwrap().path(), ["a", "b"]);
    }

    #[test]
    fn test_get_missing_key() {
        let root = sample();
        let err = root.get("author.middlename").unwrap_err();
        assert_eq!(err.to_string(), "Configuration has no entry 'author.middlename'");
        assert_eq!(root.get_or("author.middlename", "-"), Value::from("-"));
        assert!(root.get("name.first").is_err());
    }

    #[test]
    fn test_section_errors() {
        let root = sample();
        assert!(matches!(
            root.section("name"),
            Err(polyconf_types::PolyconfError::Config(ConfigError::NotASection { .. }))
        ));
        assert!(matches!(
            root.section("missing"),
            Err(polyconf_types::PolyconfError::Config(ConfigError::KeyResolution { .. }))
        ));
        assert!(matches!(
            root.value("author"),
            Err(polyconf_types::PolyconfError::Config(ConfigError::NotALeaf { .. }))
        ));
    }

    #[test]
    fn test_update_through_leaf_fails() {
        let mut root = sample();
        let err = root.update_entry("name.first", "x", None).unwrap_err();
        assert_eq!(err.to_string(), "'name' is not a section");
    }

    #[test]
    fn test_mapping_merges_into_section() {
        let mut root = sample();
        let extra: Map = vec![("email", "gah@example.com")].into_iter().collect();
        root.update_entry("author", extra, None).unwrap();

        assert_eq!(
            root.section("author").unwrap().entry_keys(),
            vec!["firstname", "lastname", "email"]
        );
    }

    #[test]
    fn test_list_indexing_and_broadcast() {
        let mut root = sample();
        root.update_entry("servers", servers(), Some("test")).unwrap();

        assert!(root.section("servers").unwrap().is_list());
        assert_eq!(root.value("servers.1.host").unwrap(), Value::from("b"));
        assert_eq!(root.value("versions.0").unwrap(), Value::Float(3.6));
        assert_eq!(
            root.get("servers.host").unwrap().to_value(),
            Value::from(vec!["a", "b"])
        );
        assert!(root.get("servers.user").is_err());
        assert!(root.get("versions.5").is_err());
    }

    #[test]
    fn test_broadcast_keeps_list_path() {
        let mut root = sample();
        root.update_entry("db.servers", servers(), Some("test")).unwrap();

        let hosts = root.get("db.servers.host").unwrap();
        let entry = hosts.as_entry().unwrap();
        assert_eq!(entry.section_path(), ["db"]);
        assert_eq!(entry.value(), &Value::from(vec!["a", "b"]));
    }

    #[test]
    fn test_dotted_child_names() {
        let inner: Map = vec![("a.b", 1)].into_iter().collect();
        let map: Map = vec![
            ("log.level", Value::from("debug")),
            ("x", Value::Map(inner)),
            ("y.z", Value::Map(vec![("k", 2)].into_iter().collect())),
        ]
        .into_iter()
        .collect();
        let mut root = Section::default();
        root.update_from_map(map, None);

        assert_eq!(root.leaf_keys(), vec!["log.level", "x.a.b", "y.z.k"]);
        for (key, value) in root.leaf_keys().iter().zip(root.leaf_values()) {
            assert_eq!(&root.value(key.as_str()).unwrap(), value);
        }
        assert!(root.node("x.a.b").is_some());
        assert_eq!(root.section("y.z").unwrap().entry_keys(), vec!["k"]);
        assert_eq!(root.section_mut("y.z").unwrap().len(), 1);

        let removed = root.remove("log.level").unwrap();
        assert_eq!(removed.to_value(), Value::from("debug"));
        assert!(root.get("log.level").is_err());
    }

    #[test]
    fn test_enumeration() {
        let mut root = sample();
        root.update_entry("servers", servers(), None).unwrap();

        assert_eq!(root.section_names(), vec!["author", "servers"]);
        assert_eq!(root.entry_keys(), vec!["name", "versions"]);
        assert_eq!(
            root.leaf_keys(),
            vec![
                "name",
                "author.firstname",
                "author.lastname",
                "versions",
                "servers.0.host",
                "servers.0.port",
                "servers.1.host",
                "servers.1.port",
            ]
        );
        assert_eq!(
            root.section("author").unwrap().leaf_keys(),
            vec!["firstname", "lastname"]
        );
    }

    #[test]
    fn test_leaf_keys_resolve_to_leaf_values() {
        let mut root = sample();
        root.update_entry("servers", servers(), None).unwrap();

        let keys = root.leaf_keys();
        let values = root.leaf_values();
        assert_eq!(keys.len(), values.len());
        for (key, value) in keys.iter().zip(values) {
            assert_eq!(&root.get(key).unwrap().to_value(), value);
        }
    }

    #[test]
    fn test_entry_provenance() {
        let root = sample();
        let entry = root.get("author.firstname").unwrap();
        let entry = entry.as_entry().unwrap();
        assert_eq!(entry.source(), Some("test"));
        assert_eq!(entry.section_path(), ["author"]);

        assert_eq!(root.get_source("name").unwrap(), "test");
        assert_eq!(root.get_source("author").unwrap(), "other, test");
        assert_eq!(
            root.sources().into_iter().collect::<Vec<_>>(),
            vec!["other", "test"]
        );
    }

    #[test]
    fn test_merge_update_and_fallback() {
        let mut base = Section::default();
        base.update_entry("a", 1, None).unwrap();
        base.update_entry("s.x", 1, None).unwrap();

        let mut other = Section::default();
        other.update_entry("a", 2, None).unwrap();
        other.update_entry("s.y", 2, None).unwrap();
        other.update_entry("b", 3, None).unwrap();

        let mut fallback = base.clone();
        fallback.merge_with(&other, false);
        assert_eq!(fallback.value("a").unwrap(), Value::Integer(1));
        assert_eq!(fallback.value("s.y").unwrap(), Value::Integer(2));

        base.merge_with(&other, true);
        assert_eq!(base.value("a").unwrap(), Value::Integer(2));
        assert_eq!(base.value("s.x").unwrap(), Value::Integer(1));
        assert_eq!(base.entry_keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_merge_with_self_is_idempotent() {
        let mut root = sample();
        root.update_entry("servers", servers(), None).unwrap();
        let before = root.as_dict();

        let copy = root.clone();
        root.merge_with(&copy, true);
        assert_eq!(root.as_dict(), before);
    }

    #[test]
    fn test_copy_section() {
        let mut root = sample();
        root.copy_section("author", "editor").unwrap();

        let editor = root.section("editor").unwrap();
        assert_eq!(editor.path(), ["editor"]);
        assert_eq!(editor.value("firstname").unwrap(), Value::from("Geir Arne"));
        assert_eq!(editor.sources_string(), "Copy of author");
        assert!(root.copy_section("name", "other").is_err());
    }

    #[test]
    fn test_remove() {
        let mut root = sample();
        let removed = root.remove("author.firstname").unwrap();
        assert_eq!(removed.to_value(), Value::from("Geir Arne"));
        assert_eq!(root.section("author").unwrap().len(), 1);
        assert!(root.remove("author.firstname").is_err());
    }
}
