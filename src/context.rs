//! Schema context
//!
//! The frozen result of a build. A [`SchemaContext`] owns every module's
//! effective node tree plus a qualified-name index, never changes after
//! construction and can be shared freely across threads.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::effective::{EffectiveType, ModuleTree, NodeIdx};
use crate::identifier::{Revision, SourceIdentifier};
use crate::reactor::{DeclaredKind, DeclaredModel, ModuleGraph, SourceIdx};
use crate::stmt::{Keyword, StatementKind, StatementLocation, YangVersion};

/// Qualified name of a schema node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QName {
    namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<Revision>,
    local_name: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, revision: Option<Revision>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            revision,
            local_name: local_name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(rev) => write!(f, "({}?revision={}){}", self.namespace, rev, self.local_name),
            None => write!(f, "({}){}", self.namespace, self.local_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionKind {
    When,
    IfFeature,
}

/// A `when`/`if-feature` attached by the `uses` or `augment` that produced a
/// node. Stored, never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub expression: String,
    /// Source declaring the condition
    pub origin: SourceIdentifier,
}

/// Index of a node within its [`Module`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One effective statement
#[derive(Debug, Clone, Serialize)]
pub struct SchemaNode {
    #[serde(skip)]
    module: usize,
    id: NodeId,
    kind: DeclaredKind,
    keyword: Keyword,
    #[serde(skip_serializing_if = "Option::is_none")]
    argument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qname: Option<QName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeId>,
    #[serde(skip)]
    parent: Option<NodeId>,
    #[serde(skip)]
    location: StatementLocation,
    augmenting: bool,
    added_by_uses: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_type: Option<EffectiveType>,
}

impl SchemaNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &DeclaredKind {
        &self.kind
    }

    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self.kind {
            DeclaredKind::Statement(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &Keyword {
        &self.keyword
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Qualified name; only set on schema nodes of the data tree
    pub fn qname(&self) -> Option<&QName> {
        self.qname.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn location(&self) -> &StatementLocation {
        &self.location
    }

    /// Added to its parent by an `augment`
    pub fn is_augmenting(&self) -> bool {
        self.augmenting
    }

    /// Copied from a grouping by `uses`
    pub fn is_added_by_uses(&self) -> bool {
        self.added_by_uses
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// An effective module with its submodules merged in
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    id: SourceIdentifier,
    namespace: String,
    prefix: String,
    version: YangVersion,
    submodules: Vec<SourceIdentifier>,
    imports: Vec<SourceIdentifier>,
    nodes: Vec<SchemaNode>,
}

impl Module {
    pub fn id(&self) -> &SourceIdentifier {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn revision(&self) -> Option<Revision> {
        self.id.revision()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> YangVersion {
        self.version
    }

    pub fn submodules(&self) -> &[SourceIdentifier] {
        &self.submodules
    }

    pub fn imports(&self) -> &[SourceIdentifier] {
        &self.imports
    }

    pub fn root(&self) -> &SchemaNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Top-level statements of the given kind (groupings, features, ...)
    pub fn top_level(&self, kind: StatementKind) -> impl Iterator<Item = &SchemaNode> + '_ {
        self.root()
            .children
            .iter()
            .map(|&c| &self.nodes[c.0])
            .filter(move |n| n.statement_kind() == Some(kind))
    }

    /// Top-level data tree nodes, including those added by other modules
    pub fn data_children(&self) -> impl Iterator<Item = &SchemaNode> + '_ {
        self.root()
            .children
            .iter()
            .map(|&c| &self.nodes[c.0])
            .filter(|n| n.qname.is_some())
    }
}

/// Immutable, thread-safe result of a build
#[derive(Debug, Clone)]
pub struct SchemaContext {
    modules: Vec<Module>,
    by_id: BTreeMap<SourceIdentifier, usize>,
    index: BTreeMap<QName, Vec<(usize, NodeId)>>,
    graph: ModuleGraph,
}

struct Freezer<'a> {
    model: &'a DeclaredModel,
    tree: &'a ModuleTree,
    module: usize,
    out: Vec<SchemaNode>,
}

impl Freezer<'_> {
    fn qname(&self, namespace: SourceIdx, local: &str) -> QName {
        let source = &self.model.sources()[namespace];
        QName::new(source.namespace().unwrap_or_default(), source.id().revision(), local)
    }

    fn copy(&mut self, idx: NodeIdx, parent: Option<NodeId>, in_data_tree: bool) -> NodeId {
        let tree = self.tree;
        let node = tree.node(idx);
        let id = NodeId(self.out.len());
        let data = parent.is_none() || (in_data_tree && node.is_schema_node());
        let qname = (parent.is_some() && data).then(|| self.qname(node.namespace, node.schema_name()));

        self.out.push(SchemaNode {
            module: self.module,
            id,
            kind: node.kind.clone(),
            keyword: node.keyword.clone(),
            argument: node.argument.clone(),
            qname,
            children: Vec::with_capacity(node.children.len()),
            parent,
            location: node.location.clone(),
            augmenting: node.augmenting,
            added_by_uses: node.added_by_uses,
            conditions: node.conditions.clone(),
            effective_type: node.effective_type.clone(),
        });

        for &child in &node.children {
            let child_id = self.copy(child, Some(id), data);
            self.out[id.0].children.push(child_id);
        }
        id
    }
}

impl SchemaContext {
    pub(crate) fn freeze(model: &DeclaredModel, trees: Vec<ModuleTree>) -> Self {
        let mut modules = Vec::with_capacity(trees.len());
        let mut by_id = BTreeMap::new();
        let mut index: BTreeMap<QName, Vec<(usize, NodeId)>> = BTreeMap::new();
        let graph = model.module_graph().clone();

        for (pos, tree) in trees.iter().enumerate() {
            let source = &model.sources()[tree.module];
            let mut freezer = Freezer {
                model,
                tree,
                module: pos,
                out: Vec::with_capacity(tree.nodes.len()),
            };
            freezer.copy(ModuleTree::ROOT, None, true);
            let nodes = freezer.out;

            for node in &nodes {
                if let Some(qname) = &node.qname {
                    index.entry(qname.clone()).or_default().push((pos, node.id));
                }
            }

            by_id.insert(source.id().clone(), pos);
            modules.push(Module {
                id: source.id().clone(),
                namespace: source.namespace().unwrap_or_default().to_string(),
                prefix: source.prefix().to_string(),
                version: source.version(),
                submodules: model
                    .family(tree.module)
                    .iter()
                    .skip(1)
                    .map(|&s| model.sources()[s].id().clone())
                    .collect(),
                imports: graph.imports_of(source.id()).into_iter().cloned().collect(),
                nodes,
            });
        }

        Self {
            modules,
            by_id,
            index,
            graph,
        }
    }

    /// All modules, in identifier order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_by_id(&self, id: &SourceIdentifier) -> Option<&Module> {
        self.by_id.get(id).map(|&pos| &self.modules[pos])
    }

    /// Module by name and exact revision, or the latest revision when `None`
    pub fn module(&self, name: &str, revision: Option<Revision>) -> Option<&Module> {
        match revision {
            Some(_) => self.module_by_id(&SourceIdentifier::new(name, revision)),
            None => self.latest_module(name),
        }
    }

    pub fn latest_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().rev().find(|m| m.name() == name)
    }

    /// Modules declaring `namespace`, oldest first
    pub fn modules_by_namespace<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a Module> + 'a {
        self.modules.iter().filter(move |m| m.namespace == namespace)
    }

    pub fn module_of(&self, node: &SchemaNode) -> &Module {
        &self.modules[node.module]
    }

    pub fn node<'a>(&self, module: &'a Module, id: NodeId) -> Option<&'a SchemaNode> {
        module.node(id)
    }

    /// Every data tree node with the given qualified name
    pub fn find_nodes(&self, qname: &QName) -> Vec<&SchemaNode> {
        self.index
            .get(qname)
            .map(|refs| refs.iter().map(|&(m, id)| &self.modules[m].nodes[id.0]).collect())
            .unwrap_or_default()
    }

    /// First data tree node with the given qualified name
    pub fn find_node(&self, qname: &QName) -> Option<&SchemaNode> {
        self.index
            .get(qname)
            .and_then(|refs| refs.first())
            .map(|&(m, id)| &self.modules[m].nodes[id.0])
    }

    /// Follow a schema path from the top level of the module declaring its first step
    pub fn find_path(&self, path: &[QName]) -> Option<&SchemaNode> {
        let (first, rest) = path.split_first()?;
        let module = self
            .modules
            .iter()
            .find(|m| m.namespace == first.namespace && m.revision() == first.revision)?;
        let mut current = module.data_children().find(|n| n.qname.as_ref() == Some(first))?;
        for step in rest {
            current = self.child(current, step)?;
        }
        Some(current)
    }

    pub fn children<'a>(&'a self, node: &'a SchemaNode) -> impl Iterator<Item = &'a SchemaNode> + 'a {
        let module = &self.modules[node.module];
        node.children.iter().map(move |&c| &module.nodes[c.0])
    }

    /// Data tree children of `node`
    pub fn schema_children<'a>(&'a self, node: &'a SchemaNode) -> impl Iterator<Item = &'a SchemaNode> + 'a {
        self.children(node).filter(|n| n.qname.is_some())
    }

    pub fn child<'a>(&'a self, node: &'a SchemaNode, qname: &QName) -> Option<&'a SchemaNode> {
        self.children(node).find(|n| n.qname.as_ref() == Some(qname))
    }

    pub fn parent(&self, node: &SchemaNode) -> Option<&SchemaNode> {
        node.parent.map(|p| &self.modules[node.module].nodes[p.0])
    }

    /// All nodes below `node`, preorder
    pub fn descendants<'a>(&'a self, node: &'a SchemaNode) -> Vec<&'a SchemaNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&SchemaNode> = self.children(node).collect();
        stack.reverse();
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children: Vec<&SchemaNode> = self.children(current).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Resolved type of a `type` node, or of the `type` child of a leaf,
    /// leaf-list or typedef
    pub fn effective_type<'a>(&'a self, node: &'a SchemaNode) -> Option<&'a EffectiveType> {
        node.effective_type.as_ref().or_else(|| {
            self.children(node)
                .find(|c| c.statement_kind() == Some(StatementKind::Type))
                .and_then(|c| c.effective_type.as_ref())
        })
    }

    pub fn module_graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// SHA-256 over the serialized modules; equal for equal effective models
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let canonical = serde_json::to_vec(&self.modules)?;
        Ok(format!("{:x}", Sha256::digest(&canonical)))
    }

    /// Module graph in GraphViz DOT format
    pub fn to_dot(&self) -> String {
        self.graph.to_dot()
    }
}
