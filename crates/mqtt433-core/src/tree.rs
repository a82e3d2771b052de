//! Schema-less configuration tree.
//!
//! A document is walked once, recursively. Every element that contains at
//! least one child element becomes a [`ConfigNode::Record`]; every other
//! element becomes a [`ConfigNode::Scalar`] whose text is classified by
//! [`TypedValue::parse`]. No schema is consulted.

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::value::TypedValue;

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Record(ConfigTree),
    Scalar(TypedValue),
}

impl ConfigNode {
    pub fn as_record(&self) -> Option<&ConfigTree> {
        match self {
            Self::Record(tree) => Some(tree),
            Self::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&TypedValue> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Record(_) => None,
        }
    }
}

impl From<ConfigTree> for ConfigNode {
    fn from(tree: ConfigTree) -> Self {
        Self::Record(tree)
    }
}

impl From<TypedValue> for ConfigNode {
    fn from(value: TypedValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for ConfigNode {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for ConfigNode {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i64> for ConfigNode {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for ConfigNode {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

/// Insertion-ordered mapping from tag to node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    entries: IndexMap<String, ConfigNode>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.entries.get_mut(key)
    }

    /// Nested record under `key`, if the node is a record.
    pub fn record(&self, key: &str) -> Option<&ConfigTree> {
        self.get(key).and_then(ConfigNode::as_record)
    }

    /// Leaf value under `key`, if the node is a scalar.
    pub fn scalar(&self, key: &str) -> Option<&TypedValue> {
        self.get(key).and_then(ConfigNode::as_scalar)
    }

    /// Follow a path of keys through nested records.
    pub fn get_path(&self, path: &[&str]) -> Option<&ConfigNode> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for key in parents {
            current = current.record(key)?;
        }
        current.get(last)
    }

    /// Insert or replace a node, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<ConfigNode>) -> Option<ConfigNode> {
        self.entries.insert(key.into(), node.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigNode> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Only the entries that are nested records.
    pub fn records(&self) -> impl Iterator<Item = (&str, &ConfigTree)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_record().map(|tree| (k.as_str(), tree)))
    }

    /// Only the entries that are leaf values.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_scalar().map(|value| (k.as_str(), value)))
    }

    /// Build a tree from the children of `element`.
    pub(crate) fn from_element(element: roxmltree::Node<'_, '_>) -> Result<Self> {
        let mut tree = Self::new();

        for kid in element.children().filter(roxmltree::Node::is_element) {
            let key = kid.tag_name().name();
            let node = if has_element_children(kid) {
                ConfigNode::Record(Self::from_element(kid)?)
            } else {
                ConfigNode::Scalar(TypedValue::parse(kid.text().unwrap_or("")))
            };

            if tree.contains_key(key) {
                return Err(ConfigError::DuplicateKey {
                    parent: element.tag_name().name().to_string(),
                    key: key.to_string(),
                });
            }
            tree.entries.insert(key.to_string(), node);
        }

        Ok(tree)
    }

    /// Append the XML for this tree's children to `out`, indented with tabs.
    pub(crate) fn write_xml(&self, out: &mut String, depth: usize) {
        for (key, node) in &self.entries {
            push_indent(out, depth);
            match node {
                ConfigNode::Record(tree) if tree.is_empty() => {
                    out.push_str(&format!("<{}/>\n", key));
                }
                ConfigNode::Record(tree) => {
                    out.push_str(&format!("<{}>\n", key));
                    tree.write_xml(out, depth + 1);
                    push_indent(out, depth);
                    out.push_str(&format!("</{}>\n", key));
                }
                ConfigNode::Scalar(value) => {
                    let text = value.format();
                    if text.is_empty() {
                        out.push_str(&format!("<{}/>\n", key));
                    } else {
                        out.push_str(&format!("<{}>{}</{}>\n", key, escape_text(&text), key));
                    }
                }
            }
        }
    }
}

fn has_element_children(node: roxmltree::Node<'_, '_>) -> bool {
    node.children().any(|kid| kid.is_element())
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
