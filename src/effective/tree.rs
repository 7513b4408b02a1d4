//! Mutable per-module node arena used while building the effective model

use crate::context::Condition;
use crate::reactor::{DeclaredKind, SourceIdx};
use crate::stmt::{Keyword, StatementKind, StatementLocation};

use super::types::EffectiveType;

pub(crate) type NodeIdx = usize;

#[derive(Debug, Clone)]
pub(crate) struct EffNode {
    pub kind: DeclaredKind,
    pub keyword: Keyword,
    pub argument: Option<String>,
    pub children: Vec<NodeIdx>,
    pub parent: Option<NodeIdx>,
    /// Module whose namespace the node lives in
    pub namespace: SourceIdx,
    /// Source the statement was written in (prefix resolution)
    pub lexical: SourceIdx,
    pub location: StatementLocation,
    pub augmenting: bool,
    pub added_by_uses: bool,
    pub conditions: Vec<Condition>,
    pub effective_type: Option<EffectiveType>,
}

impl EffNode {
    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self.kind {
            DeclaredKind::Statement(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is(&self, kind: StatementKind) -> bool {
        self.statement_kind() == Some(kind)
    }

    pub fn is_schema_node(&self) -> bool {
        self.statement_kind().is_some_and(|k| k.is_schema_node())
    }

    /// Name used in schema node identifiers; `input`/`output` go by keyword
    pub fn schema_name(&self) -> &str {
        match self.statement_kind() {
            Some(StatementKind::Input | StatementKind::Output) => &self.keyword.identifier,
            _ => self.argument.as_deref().unwrap_or_default(),
        }
    }
}

/// A detached copy of a subtree, indices relative to its own root at 0
#[derive(Debug, Clone)]
pub(crate) struct Subtree {
    nodes: Vec<EffNode>,
}

#[derive(Debug, Clone)]
pub(crate) struct ModuleTree {
    pub module: SourceIdx,
    pub nodes: Vec<EffNode>,
}

impl ModuleTree {
    pub const ROOT: NodeIdx = 0;

    pub fn new(module: SourceIdx, root: EffNode) -> Self {
        Self {
            module,
            nodes: vec![root],
        }
    }

    pub fn node(&self, idx: NodeIdx) -> &EffNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIdx) -> &mut EffNode {
        &mut self.nodes[idx]
    }

    /// Append `node` as the last child of `parent`
    pub fn add(&mut self, parent: NodeIdx, mut node: EffNode) -> NodeIdx {
        let idx = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Unlink `idx` from its parent; the node stays in the arena unreachable
    pub fn detach(&mut self, idx: NodeIdx) {
        if let Some(parent) = self.nodes[idx].parent.take() {
            self.nodes[parent].children.retain(|&c| c != idx);
        }
    }

    /// Schema-node children of `idx`
    pub fn schema_children(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        self.nodes[idx]
            .children
            .iter()
            .copied()
            .filter(move |&c| self.nodes[c].is_schema_node())
    }

    pub fn find_schema_child(&self, idx: NodeIdx, namespace: Option<SourceIdx>, name: &str) -> Option<NodeIdx> {
        self.schema_children(idx).find(|&c| {
            let node = &self.nodes[c];
            node.schema_name() == name && namespace.map_or(true, |ns| node.namespace == ns)
        })
    }

    /// Children of `idx` bound to `kind`
    pub fn children_of_kind(&self, idx: NodeIdx, kind: StatementKind) -> Vec<NodeIdx> {
        self.nodes[idx]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is(kind))
            .collect()
    }

    /// Apply `f` to `idx` and all its descendants
    pub fn for_each_in_subtree(&mut self, idx: NodeIdx, f: &mut impl FnMut(&mut EffNode)) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            f(&mut self.nodes[current]);
            stack.extend(self.nodes[current].children.iter().copied());
        }
    }

    pub fn snapshot(&self, idx: NodeIdx) -> Subtree {
        let mut nodes = Vec::new();
        self.copy_into(idx, None, &mut nodes);
        Subtree { nodes }
    }

    fn copy_into(&self, idx: NodeIdx, parent: Option<NodeIdx>, out: &mut Vec<EffNode>) -> NodeIdx {
        let position = out.len();
        let mut node = self.nodes[idx].clone();
        node.parent = parent;
        node.children = Vec::with_capacity(node.children.len());
        out.push(node);
        for &child in &self.nodes[idx].children {
            let copied = self.copy_into(child, Some(position), out);
            out[position].children.push(copied);
        }
        position
    }

    /// Insert a snapshot as the last child of `parent`, returning the new root
    pub fn graft(&mut self, parent: NodeIdx, subtree: Subtree) -> NodeIdx {
        let offset = self.nodes.len();
        for mut node in subtree.nodes {
            node.children.iter_mut().for_each(|c| *c += offset);
            node.parent = Some(node.parent.map_or(parent, |p| p + offset));
            self.nodes.push(node);
        }
        self.nodes[parent].children.push(offset);
        offset
    }
}
