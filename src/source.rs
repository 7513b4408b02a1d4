//! Statement-tree sources handed to a build session

use crate::error::Result;
use crate::parser::parse_yang;
use crate::stmt::StatementNode;

/// One parsed-but-unlinked source: the root `module`/`submodule` statement
#[derive(Debug, Clone)]
pub struct YangSource {
    origin: String,
    root: StatementNode,
}

impl YangSource {
    /// Tokenize text in the YANG textual syntax
    pub fn from_text(origin: impl Into<String>, text: &str) -> Result<Self> {
        let origin = origin.into();
        let root = parse_yang(&origin, text)?;
        Ok(Self { origin, root })
    }

    /// Wrap a tree produced by some other tokenizer
    pub fn from_tree(origin: impl Into<String>, root: StatementNode) -> Self {
        Self {
            origin: origin.into(),
            root,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn root(&self) -> &StatementNode {
        &self.root
    }

    pub(crate) fn into_root(self) -> StatementNode {
        self.root
    }
}
