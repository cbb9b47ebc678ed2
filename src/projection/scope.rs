//! Include/exclude scope for one level of serialization

use super::tree::{ProjectionNode, ProjectionTree};
use crate::errors::{QueryError, QueryResult};

/// What the include side says about the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Include<'a> {
    /// No opinion: default discovery applies
    Open,
    /// Stop descending: scalar fields and hybrids only
    Stop,
    /// Explicit list of attributes to emit
    Tree(&'a ProjectionTree),
}

/// Include and exclude trees in effect at one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionScope<'a> {
    pub include: Include<'a>,
    pub exclude: Option<&'a ProjectionTree>,
}

impl<'a> ProjectionScope<'a> {
    /// Top-level scope; supplying both trees is a conflict
    pub fn new(
        include: Option<&'a ProjectionTree>,
        exclude: Option<&'a ProjectionTree>,
    ) -> QueryResult<Self> {
        if include.is_some() && exclude.is_some() {
            return Err(QueryError::ConflictingProjection(
                "include and exclude given for the same scope".into(),
            ));
        }
        Ok(Self {
            include: include.map_or(Include::Open, Include::Tree),
            exclude,
        })
    }

    /// Scope with no opinion on either side
    pub fn open() -> Self {
        Self {
            include: Include::Open,
            exclude: None,
        }
    }

    /// Returns true if `key` is excluded entirely
    pub fn excludes(&self, key: &str) -> bool {
        self.exclude.is_some_and(|tree| tree.is_leaf(key))
    }

    /// Scope for the value under `key`, or `None` if `key` is excluded entirely.
    ///
    /// The include side descends into a matching subtree; a leaf entry opens
    /// the child, and anything else stops it. A subtree on the exclude side
    /// resets the include side to open, so exclusion only ever trims.
    pub fn narrow(&self, key: &str) -> Option<ProjectionScope<'a>> {
        let include = match self.include {
            Include::Tree(tree) => match tree.get(key) {
                Some(ProjectionNode::Tree(sub)) => Include::Tree(sub),
                Some(ProjectionNode::Leaf) => Include::Open,
                None => Include::Stop,
            },
            Include::Open | Include::Stop => Include::Stop,
        };

        match self.exclude.and_then(|tree| tree.get(key)) {
            Some(ProjectionNode::Leaf) => None,
            Some(ProjectionNode::Tree(sub)) => Some(ProjectionScope {
                include: Include::Open,
                exclude: Some(sub),
            }),
            None => Some(ProjectionScope {
                include,
                exclude: None,
            }),
        }
    }
}
