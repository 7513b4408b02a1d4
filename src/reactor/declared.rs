//! Declared model
//!
//! Output of FULL_DECLARATION: every source as an immutable arena of bound,
//! grammar-checked statements.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::identifier::SourceIdentifier;
use crate::stmt::{Keyword, StatementKind, StatementLocation, YangVersion};

use super::linkage::{Linkage, ModuleGraph, SourceHeader, SourceKind};
use super::SourceIdx;

/// Index of a statement within its [`DeclaredSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StmtId(pub(crate) usize);

impl StmtId {
    pub const ROOT: StmtId = StmtId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// What a declared statement was bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DeclaredKind {
    /// A built-in statement
    Statement(StatementKind),
    /// An instance of an `extension` defined by `module`
    Extension {
        module: SourceIdentifier,
        name: String,
    },
    /// Content nested inside an extension instance, kept uninterpreted
    Opaque,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclaredStatement {
    pub(crate) kind: DeclaredKind,
    pub(crate) keyword: Keyword,
    pub(crate) argument: Option<String>,
    pub(crate) children: Vec<StmtId>,
    pub(crate) parent: Option<StmtId>,
    pub(crate) location: StatementLocation,
}

impl DeclaredStatement {
    pub fn kind(&self) -> &DeclaredKind {
        &self.kind
    }

    /// The built-in kind, `None` for extension instances and their content
    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self.kind {
            DeclaredKind::Statement(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is(&self, kind: StatementKind) -> bool {
        self.statement_kind() == Some(kind)
    }

    pub fn keyword(&self) -> &Keyword {
        &self.keyword
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn children(&self) -> &[StmtId] {
        &self.children
    }

    pub fn parent(&self) -> Option<StmtId> {
        self.parent
    }

    pub fn location(&self) -> &StatementLocation {
        &self.location
    }
}

/// One fully declared source
#[derive(Debug, Clone)]
pub struct DeclaredSource {
    pub(crate) header: SourceHeader,
    pub(crate) statements: Vec<DeclaredStatement>,
    pub(crate) prefixes: BTreeMap<String, SourceIdentifier>,
}

impl DeclaredSource {
    pub fn id(&self) -> &SourceIdentifier {
        &self.header.id
    }

    pub fn kind(&self) -> SourceKind {
        self.header.kind
    }

    pub fn version(&self) -> YangVersion {
        self.header.version
    }

    pub fn namespace(&self) -> Option<&str> {
        self.header.namespace.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.header.prefix
    }

    pub fn belongs_to(&self) -> Option<&str> {
        self.header.belongs_to.as_deref()
    }

    /// The `module`/`submodule` statement
    pub fn root(&self) -> StmtId {
        StmtId::ROOT
    }

    pub fn statement(&self, id: StmtId) -> &DeclaredStatement {
        &self.statements[id.0]
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Children of `id` bound to the built-in `kind`
    pub fn children_of_kind(&self, id: StmtId, kind: StatementKind) -> impl Iterator<Item = StmtId> + '_ {
        self.statement(id)
            .children
            .iter()
            .copied()
            .filter(move |&c| self.statement(c).is(kind))
    }

    pub fn first_child(&self, id: StmtId, kind: StatementKind) -> Option<StmtId> {
        self.children_of_kind(id, kind).next()
    }

    /// Argument of the first `kind` child of `id`
    pub fn child_argument(&self, id: StmtId, kind: StatementKind) -> Option<&str> {
        self.first_child(id, kind).and_then(|c| self.statement(c).argument())
    }

    /// The module a prefix is bound to in this source
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&SourceIdentifier> {
        self.prefixes.get(prefix)
    }

    pub fn prefixes(&self) -> &BTreeMap<String, SourceIdentifier> {
        &self.prefixes
    }
}

/// All sources of a session after FULL_DECLARATION, in identifier order
#[derive(Debug, Clone)]
pub struct DeclaredModel {
    pub(crate) sources: Vec<DeclaredSource>,
    pub(crate) linkage: Linkage,
}

impl DeclaredModel {
    pub fn sources(&self) -> &[DeclaredSource] {
        &self.sources
    }

    pub fn source(&self, id: &SourceIdentifier) -> Option<&DeclaredSource> {
        self.position(id).map(|idx| &self.sources[idx])
    }

    pub fn module_graph(&self) -> &ModuleGraph {
        &self.linkage.graph
    }

    pub(crate) fn position(&self, id: &SourceIdentifier) -> Option<SourceIdx> {
        self.sources.binary_search_by(|s| s.id().cmp(id)).ok()
    }

    /// Module sources, in identifier order
    pub(crate) fn module_indices(&self) -> impl Iterator<Item = SourceIdx> + '_ {
        self.linkage.families.keys().copied()
    }

    /// The module followed by its transitively included submodules
    pub(crate) fn family(&self, module: SourceIdx) -> &[SourceIdx] {
        self.linkage
            .families
            .get(&module)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The module a source contributes to
    pub(crate) fn owner(&self, source: SourceIdx) -> SourceIdx {
        self.linkage.sources[source].module
    }

    /// Resolve a prefix as seen from `source`
    pub(crate) fn prefix_target(&self, source: SourceIdx, prefix: &str) -> Option<SourceIdx> {
        self.linkage.sources[source].prefixes.get(prefix).copied()
    }
}
