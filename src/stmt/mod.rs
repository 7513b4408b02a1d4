//! Statement trees
//!
//! A [`StatementNode`] is the generic (keyword, argument, children) form a
//! tokenizer produces for one source. The reactor consumes these trees and
//! never mutates them.

pub mod kind;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use kind::{Cardinality, Section, StatementKind};

/// Where a statement was written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementLocation {
    /// Origin of the source text (file name, URL, test label)
    pub origin: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl StatementLocation {
    pub fn new(origin: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            origin: origin.into(),
            line,
            column,
        }
    }

    /// Location for statements that were not read from text
    pub fn synthetic(origin: impl Into<Arc<str>>) -> Self {
        Self::new(origin, 0, 0)
    }
}

impl fmt::Display for StatementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.origin, self.line, self.column)
    }
}

/// A possibly prefixed statement keyword (`container`, `ext:annotation`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub identifier: String,
}

impl Keyword {
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((prefix, identifier)) => Self {
                prefix: Some(prefix.to_string()),
                identifier: identifier.to_string(),
            },
            None => Self {
                prefix: None,
                identifier: text.to_string(),
            },
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.identifier),
            None => write!(f, "{}", self.identifier),
        }
    }
}

/// YANG language version declared by a source's `yang-version` statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum YangVersion {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "1.1")]
    V1_1,
}

impl YangVersion {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "1" | "1.0" => Some(Self::V1),
            "1.1" => Some(Self::V1_1),
            _ => None,
        }
    }
}

impl fmt::Display for YangVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
            Self::V1_1 => write!(f, "1.1"),
        }
    }
}

/// One statement as produced by a tokenizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementNode {
    pub keyword: Keyword,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StatementNode>,
    pub location: StatementLocation,
}

impl StatementNode {
    pub fn new(keyword: &str, argument: Option<&str>, location: StatementLocation) -> Self {
        Self {
            keyword: Keyword::parse(keyword),
            argument: argument.map(str::to_string),
            children: Vec::new(),
            location,
        }
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: StatementNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Unprefixed children with the given keyword
    pub fn children_named<'a: 'k, 'k>(&'a self, keyword: &'k str) -> impl Iterator<Item = &'a StatementNode> + 'k {
        self.children
            .iter()
            .filter(move |c| c.keyword.prefix.is_none() && c.keyword.identifier == keyword)
    }

    pub fn first_child(&self, keyword: &str) -> Option<&StatementNode> {
        self.children
            .iter()
            .find(|c| c.keyword.prefix.is_none() && c.keyword.identifier == keyword)
    }

    /// Language version declared at this (root) statement; YANG 1 if absent
    pub fn declared_version(&self) -> Option<YangVersion> {
        match self.first_child("yang-version") {
            Some(stmt) => stmt.argument().and_then(YangVersion::parse),
            None => Some(YangVersion::V1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_prefix_split() {
        let kw = Keyword::parse("ext:annotation");
        assert_eq!(kw.prefix.as_deref(), Some("ext"));
        assert_eq!(kw.identifier, "annotation");
        assert_eq!(kw.to_string(), "ext:annotation");
        assert_eq!(Keyword::parse("leaf").prefix, None);
    }

    #[test]
    fn test_declared_version() {
        let loc = StatementLocation::synthetic("test");
        let root = StatementNode::new("module", Some("m"), loc.clone());
        assert_eq!(root.declared_version(), Some(YangVersion::V1));

        let root = root.with_child(StatementNode::new("yang-version", Some("1.1"), loc.clone()));
        assert_eq!(root.declared_version(), Some(YangVersion::V1_1));

        let bad = StatementNode::new("module", Some("m"), loc.clone())
            .with_child(StatementNode::new("yang-version", Some("2"), loc));
        assert_eq!(bad.declared_version(), None);
    }

    #[test]
    fn test_child_lookup_outlives_keyword() {
        let loc = StatementLocation::synthetic("test");
        let root = StatementNode::new("container", Some("c"), loc.clone())
            .with_child(StatementNode::new("leaf", Some("a"), loc.clone()))
            .with_child(StatementNode::new("ext:leaf", Some("skipped"), loc.clone()))
            .with_child(StatementNode::new("leaf", Some("b"), loc));

        let first = {
            let keyword = String::from("leaf");
            root.first_child(&keyword)
        };
        assert_eq!(first.and_then(|c| c.argument()), Some("a"));

        let keyword = String::from("leaf");
        let leaves: Vec<&StatementNode> = root.children_named(&keyword).collect();
        drop(keyword);
        let names: Vec<_> = leaves.iter().filter_map(|c| c.argument()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
