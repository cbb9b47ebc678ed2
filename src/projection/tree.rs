//! Projection trees
//!
//! A tree maps attribute names either to a leaf (include or exclude this
//! name entirely) or to a nested tree scoped to the related value.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::errors::{QueryError, QueryResult};

/// Entry of a [`ProjectionTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionNode {
    /// The whole attribute, no nested opinion
    Leaf,
    Tree(ProjectionTree),
}

impl ProjectionNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, ProjectionNode::Leaf)
    }

    pub fn as_tree(&self) -> Option<&ProjectionTree> {
        match self {
            ProjectionNode::Tree(tree) => Some(tree),
            ProjectionNode::Leaf => None,
        }
    }
}

/// Include or exclude tree for one scope
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectionTree {
    entries: BTreeMap<String, ProjectionNode>,
}

impl ProjectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses dotted column paths.
    ///
    /// `["author.name", "author.email", "title"]` becomes
    /// `{author: {name, email}, title}`. When a bare name and a nested path
    /// name the same key, the bare name wins.
    pub fn parse<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut tree = Self::new();
        for path in paths {
            tree.insert_path(path.as_ref());
        }
        tree
    }

    /// Adds one dotted path
    pub fn insert_path(&mut self, path: &str) {
        match path.split_once('.') {
            None => {
                self.entries.insert(path.to_string(), ProjectionNode::Leaf);
            }
            Some((head, rest)) => {
                let node = self
                    .entries
                    .entry(head.to_string())
                    .or_insert_with(|| ProjectionNode::Tree(ProjectionTree::new()));
                if let ProjectionNode::Tree(sub) = node {
                    sub.insert_path(rest);
                }
            }
        }
    }

    /// Builds a tree from `{"name": true, "rel": {...}}`
    pub fn from_json(value: &JsonValue) -> QueryResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            QueryError::InvalidConfig(format!("projection must be an object, got {}", value))
        })?;
        let mut tree = Self::new();
        for (key, entry) in object {
            let node = match entry {
                JsonValue::Bool(true) => ProjectionNode::Leaf,
                JsonValue::Object(_) => ProjectionNode::Tree(Self::from_json(entry)?),
                other => {
                    return Err(QueryError::InvalidConfig(format!(
                        "projection entry '{}' must be true or an object, got {}",
                        key, other
                    )))
                }
            };
            tree.entries.insert(key.clone(), node);
        }
        Ok(tree)
    }

    /// Renders the tree back into its `{"name": true, ...}` form
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(key, node)| {
                    let value = match node {
                        ProjectionNode::Leaf => JsonValue::Bool(true),
                        ProjectionNode::Tree(sub) => sub.to_json(),
                    };
                    (key.clone(), value)
                })
                .collect(),
        )
    }

    /// Layers `requested` inside `self`, which acts as an allowlist.
    ///
    /// Only keys present in both survive. A leaf on one side takes the other
    /// side's entry; two subtrees combine recursively.
    pub fn combine(&self, requested: &ProjectionTree) -> ProjectionTree {
        let entries = requested
            .entries
            .iter()
            .filter_map(|(key, wanted)| {
                let allowed = self.entries.get(key)?;
                let node = match (wanted, allowed) {
                    (wanted, ProjectionNode::Leaf) => wanted.clone(),
                    (ProjectionNode::Leaf, allowed) => allowed.clone(),
                    (ProjectionNode::Tree(w), ProjectionNode::Tree(a)) => {
                        ProjectionNode::Tree(a.combine(w))
                    }
                };
                Some((key.clone(), node))
            })
            .collect();
        ProjectionTree { entries }
    }

    pub fn get(&self, key: &str) -> Option<&ProjectionNode> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true if `key` maps to a leaf
    pub fn is_leaf(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(ProjectionNode::is_leaf)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
