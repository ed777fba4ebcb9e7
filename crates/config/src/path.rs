//! Dotted key paths

use std::fmt;

/// Address of a node in a configuration tree
///
/// Parsed from a dotted string (`"database.replica.host"`) or built from a
/// sequence of components. The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Parse a dotted path
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        Self(path.split('.').map(str::to_string).collect())
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent components and the last component, `None` for the root
    pub fn split_last(&self) -> Option<(&String, &[String])> {
        self.0.split_last()
    }

    /// Path extended by one component
    pub fn join(&self, component: impl Into<String>) -> Self {
        let mut components = self.0.clone();
        components.push(component.into());
        Self(components)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for KeyPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&String> for KeyPath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<&KeyPath> for KeyPath {
    fn from(path: &KeyPath) -> Self {
        path.clone()
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(components: Vec<String>) -> Self {
        Self(components)
    }
}

impl From<Vec<&str>> for KeyPath {
    fn from(components: Vec<&str>) -> Self {
        Self(components.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyPath {
    fn from(components: &[&str]) -> Self {
        Self(components.iter().map(|c| c.to_string()).collect())
    }
}

impl From<&[String]> for KeyPath {
    fn from(components: &[String]) -> Self {
        Self(components.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(components: [&str; N]) -> Self {
        Self(components.iter().map(|c| c.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_path() {
        let path = KeyPath::parse("a.b.c");
        assert_eq!(path.components(), ["a", "b", "c"]);
        assert_eq!(path.to_string(), "a.b.c");
        assert!(KeyPath::parse("").is_root());
    }

    #[test]
    fn test_component_sequences() {
        assert_eq!(KeyPath::from(["a", "b.c"]).components(), ["a", "b.c"]);
        assert_eq!(KeyPath::from(vec!["x"]), KeyPath::parse("x"));
        assert_eq!(KeyPath::parse("a").join("0"), KeyPath::parse("a.0"));
    }
}
