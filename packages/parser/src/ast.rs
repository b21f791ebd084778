use crate::id_generator::detached_key;
use serde::{Deserialize, Serialize};

/// Attribute that, when present, supplies the node key
pub const KEY_ATTRIBUTE: &str = "key";

/// Ordered attribute list.
///
/// A name appears at most once. Inserting an existing name replaces its value
/// in place, so the first position and the last value win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(String, Option<String>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when absent, `Some(None)` when present without a value
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Option<String>)> {
        self.entries
            .iter_mut()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

/// One entry in a node's child list.
///
/// Text runs stay plain strings so literal text is never mistaken for markup
/// that still has to be compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Child {
    Node(Node),
    Text(String),
}

impl Child {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Text(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Child::Text(text) => Some(text),
            Child::Node(_) => None,
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

/// Addresses a child either by position or by node key
#[derive(Debug, Clone, Copy)]
pub enum ChildRef<'a> {
    Index(usize),
    Key(&'a str),
}

impl From<usize> for ChildRef<'_> {
    fn from(index: usize) -> Self {
        ChildRef::Index(index)
    }
}

impl<'a> From<&'a str> for ChildRef<'a> {
    fn from(key: &'a str) -> Self {
        ChildRef::Key(key)
    }
}

/// Element node in a template tree.
///
/// Parent and sibling relations are not stored on the node; they are derived
/// from the owning parent's child list when asked for (see [`Cursor`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    key: String,
    kind: String,
    pub attributes: Attributes,
    pub children: Vec<Child>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self::element(kind, Attributes::new(), Vec::new())
    }

    /// Build a node; the key comes from the `key` attribute when one is given.
    pub fn element(kind: impl Into<String>, attributes: Attributes, children: Vec<Child>) -> Self {
        let key = match attributes.get(KEY_ATTRIBUTE) {
            Some(Some(key)) => key.to_string(),
            _ => Self::new_key(),
        };
        Self::with_key(key, kind, attributes, children)
    }

    pub fn with_key(
        key: impl Into<String>,
        kind: impl Into<String>,
        attributes: Attributes,
        children: Vec<Child>,
    ) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            attributes,
            children,
        }
    }

    /// Node without a tag: only its children are rendered
    pub fn transparent(children: Vec<Child>) -> Self {
        Self::element("", Attributes::new(), children)
    }

    /// Fresh process-unique key
    pub fn new_key() -> String {
        detached_key()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_transparent(&self) -> bool {
        self.kind.trim().is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Option<String>) {
        self.attributes.insert(name, value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Option<String>> {
        self.attributes.remove(name)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn add_child(&mut self, child: impl Into<Child>) {
        self.children.push(child.into());
    }

    /// Replace a child. Returns `false` when nothing matched.
    pub fn update_child<'a>(&mut self, at: impl Into<ChildRef<'a>>, child: impl Into<Child>) -> bool {
        let index = match at.into() {
            ChildRef::Index(index) if index < self.children.len() => index,
            ChildRef::Index(_) => return false,
            ChildRef::Key(key) => match self.position_of(key) {
                Some(index) => index,
                None => return false,
            },
        };

        self.children[index] = child.into();
        true
    }

    /// Detach and return every child
    pub fn remove_all_children(&mut self) -> Vec<Child> {
        std::mem::take(&mut self.children)
    }

    pub fn child(&self, key: &str) -> Option<&Node> {
        self.children
            .iter()
            .filter_map(Child::as_node)
            .find(|node| node.key == key)
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .filter_map(Child::as_node_mut)
            .find(|node| node.key == key)
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| matches!(child, Child::Node(node) if node.key == key))
    }
}

/// Node directly after `index` in `children`, if that entry is a node
pub fn next_sibling(children: &[Child], index: usize) -> Option<&Node> {
    children.get(index.checked_add(1)?).and_then(Child::as_node)
}

/// Node directly before `index` in `children`, if that entry is a node
pub fn previous_sibling(children: &[Child], index: usize) -> Option<&Node> {
    children.get(index.checked_sub(1)?).and_then(Child::as_node)
}

/// Read-only position inside a tree.
///
/// Structural relations are recomputed from the root on every query, so they
/// always reflect the tree as it is now.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    root: &'a Node,
    path: Vec<usize>,
    node: &'a Node,
}

impl<'a> Cursor<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self {
            root,
            path: Vec::new(),
            node: root,
        }
    }

    /// Cursor at the node reached by following child indices from `root`
    pub fn at(root: &'a Node, path: &[usize]) -> Option<Self> {
        let mut node = root;
        for index in path {
            node = node.children.get(*index)?.as_node()?;
        }

        Some(Self {
            root,
            path: path.to_vec(),
            node,
        })
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn parent(&self) -> Option<Cursor<'a>> {
        let (_, parent_path) = self.path.split_last()?;
        Cursor::at(self.root, parent_path)
    }

    pub fn next_sibling(&self) -> Option<Cursor<'a>> {
        self.sibling(|index| index.checked_add(1))
    }

    pub fn previous_sibling(&self) -> Option<Cursor<'a>> {
        self.sibling(|index| index.checked_sub(1))
    }

    /// Cursors for the node children, skipping text runs
    pub fn children(&self) -> Vec<Cursor<'a>> {
        self.node
            .children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| {
                let node = child.as_node()?;
                let mut path = self.path.clone();
                path.push(index);
                Some(Cursor {
                    root: self.root,
                    path,
                    node,
                })
            })
            .collect()
    }

    fn sibling(&self, step: impl Fn(usize) -> Option<usize>) -> Option<Cursor<'a>> {
        let (index, parent_path) = self.path.split_last()?;
        let mut path = parent_path.to_vec();
        path.push(step(*index)?);
        Cursor::at(self.root, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(entries: &[(&str, Option<&str>)]) -> Attributes {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_creates_node_with_same_type() {
        let node = Node::new("div");
        assert_eq!(node.kind(), "div");
        assert!(!node.is_transparent());
    }

    #[test]
    fn test_uses_generated_key() {
        let node = Node::new("div");
        assert!(node.key().starts_with("cmp-"));
    }

    #[test]
    fn test_uses_given_key() {
        let node = Node::element("div", attrs(&[("key", Some("some-key"))]), vec![]);
        assert_eq!(node.key(), "some-key");
        assert!(node.has_attribute("key"));
    }

    #[test]
    fn test_presence_only_attribute_is_distinct_from_empty() {
        let node = Node::element("div", attrs(&[("attr", None), ("empty", Some(""))]), vec![]);
        assert_eq!(node.attribute("attr"), Some(None));
        assert_eq!(node.attribute("empty"), Some(Some("")));
        assert_eq!(node.attribute("missing"), None);
    }

    #[test]
    fn test_attribute_reinsert_keeps_position_and_takes_last_value() {
        let mut attributes = Attributes::new();
        attributes.insert("style", Some("red".into()));
        attributes.insert("class", Some("x".into()));
        attributes.insert("style", Some("green".into()));

        let collected: Vec<_> = attributes.iter().collect();
        assert_eq!(collected, vec![("style", Some("green")), ("class", Some("x"))]);
    }

    #[test]
    fn test_remove_attribute() {
        let mut node = Node::element("div", attrs(&[(":if", Some("$a"))]), vec![]);
        assert_eq!(node.remove_attribute(":if"), Some(Some("$a".to_string())));
        assert!(!node.has_attribute(":if"));
        assert_eq!(node.remove_attribute(":if"), None);
    }

    #[test]
    fn test_sets_siblings() {
        let mut parent = Node::new("div");
        let first = Node::new("p");
        let second = Node::new("p");
        let (first_key, second_key) = (first.key().to_string(), second.key().to_string());
        parent.add_child(first);
        parent.add_child(second);

        let root = Cursor::new(&parent);
        let children = root.children();
        let next = children[0].next_sibling().unwrap();
        let previous = children[1].previous_sibling().unwrap();

        assert_eq!(next.node().key(), second_key);
        assert_eq!(previous.node().key(), first_key);
        assert!(children[0].previous_sibling().is_none());
        assert!(children[1].next_sibling().is_none());
    }

    #[test]
    fn test_sets_parent() {
        let mut parent = Node::new("div");
        parent.add_child(Node::new("p"));
        parent.add_child(Node::new("p"));

        let root = Cursor::new(&parent);
        for child in root.children() {
            assert_eq!(child.parent().unwrap().node().key(), parent.key());
        }
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_text_between_nodes_breaks_adjacency() {
        let mut parent = Node::new("div");
        parent.add_child(Node::new("p"));
        parent.add_child("text");
        parent.add_child(Node::new("p"));

        assert!(next_sibling(&parent.children, 0).is_none());
        assert!(previous_sibling(&parent.children, 2).is_none());
    }

    #[test]
    fn test_siblings_follow_later_mutation() {
        let mut parent = Node::new("div");
        parent.add_child(Node::new("a"));
        parent.add_child(Node::new("b"));
        parent.add_child(Node::new("c"));

        parent.children.remove(1);

        let first = Cursor::at(&parent, &[0]).unwrap();
        assert_eq!(first.next_sibling().unwrap().node().kind(), "c");
    }

    #[test]
    fn test_updates_child_with_index() {
        let mut parent = Node::new("div");
        parent.add_child(Node::new("p"));

        assert!(parent.update_child(0, "string content"));
        assert_eq!(parent.children[0].as_text(), Some("string content"));
    }

    #[test]
    fn test_updates_child_with_key() {
        let mut parent = Node::new("div");
        let child = Node::new("p");
        let key = child.key().to_string();
        parent.add_child(child);

        assert!(parent.update_child(key.as_str(), "string content"));
        assert_eq!(parent.children[0].as_text(), Some("string content"));
    }

    #[test]
    fn test_skips_child_update_with_invalid_key() {
        let mut parent = Node::new("div");
        parent.add_child(Node::new("p"));

        assert!(!parent.update_child("key", "string content"));
        assert!(parent.children[0].as_node().is_some());
    }

    #[test]
    fn test_finds_child_with_key() {
        let mut parent = Node::new("div");
        let child = Node::new("p");
        let key = child.key().to_string();
        parent.add_child(child);

        assert!(parent.child(&key).is_some());
        assert!(parent.child("some key").is_none());
    }

    #[test]
    fn test_remove_all_children() {
        let mut parent = Node::new("div");
        parent.add_child("a");
        parent.add_child(Node::new("p"));

        let removed = parent.remove_all_children();
        assert_eq!(removed.len(), 2);
        assert!(!parent.has_children());
    }
}
