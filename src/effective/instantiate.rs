//! Per-module instantiation
//!
//! Copies a module's declared statements (and those of its submodules) into
//! a [`ModuleTree`], expanding `uses` in place and resolving types on the way.

use tracing::trace;

use crate::context::{Condition, ConditionKind};
use crate::error::{ReactorError, Result};
use crate::reactor::{DeclaredKind, DeclaredModel, SourceIdx, StmtId};
use crate::stmt::{Section, StatementKind};

use super::scope::{find_definition, parse_path, Scope};
use super::tree::{EffNode, ModuleTree, NodeIdx};
use super::types::TypeResolver;

/// Whether a statement is copied from a grouping into the using parent
fn is_instantiable(kind: &DeclaredKind) -> bool {
    match kind {
        DeclaredKind::Statement(k) => {
            k.is_data_definition() || matches!(k, StatementKind::Action | StatementKind::Notification)
        }
        _ => false,
    }
}

/// Whether an augment child is spliced into the target
pub(crate) fn is_augment_content(kind: &DeclaredKind) -> bool {
    is_instantiable(kind) || *kind == DeclaredKind::Statement(StatementKind::Case)
}

/// `when` and `if-feature` conditions declared directly under `stmt`
pub(crate) fn conditions_of(model: &DeclaredModel, source: SourceIdx, stmt: StmtId) -> Vec<Condition> {
    let src = &model.sources()[source];
    src.statement(stmt)
        .children()
        .iter()
        .filter_map(|&c| {
            let child = src.statement(c);
            let kind = match child.statement_kind()? {
                StatementKind::When => ConditionKind::When,
                StatementKind::IfFeature => ConditionKind::IfFeature,
                _ => return None,
            };
            Some(Condition {
                kind,
                expression: child.argument().unwrap_or_default().to_string(),
                origin: src.id().clone(),
            })
        })
        .collect()
}

/// `when` and `if-feature` conditions among the children of an instantiated node
pub(crate) fn conditions_of_node(model: &DeclaredModel, tree: &ModuleTree, node: NodeIdx) -> Vec<Condition> {
    let origin = model.sources()[tree.node(node).lexical].id();
    tree.node(node)
        .children
        .iter()
        .filter_map(|&c| {
            let child = tree.node(c);
            let kind = match child.statement_kind()? {
                StatementKind::When => ConditionKind::When,
                StatementKind::IfFeature => ConditionKind::IfFeature,
                _ => return None,
            };
            Some(Condition {
                kind,
                expression: child.argument.clone().unwrap_or_default(),
                origin: origin.clone(),
            })
        })
        .collect()
}

/// Properties a refine replaces rather than adds to
fn refine_replaces(kind: StatementKind, target: StatementKind) -> bool {
    match kind {
        StatementKind::Must | StatementKind::IfFeature => false,
        StatementKind::Default => target != StatementKind::LeafList,
        _ => true,
    }
}

pub(crate) struct Instantiator<'m> {
    model: &'m DeclaredModel,
    tree: ModuleTree,
    uses_stack: Vec<((SourceIdx, StmtId), String)>,
    types: TypeResolver<'m>,
}

impl<'m> Instantiator<'m> {
    /// Build the tree of `module`, including its submodules' bodies
    pub fn build(model: &'m DeclaredModel, module: SourceIdx) -> Result<ModuleTree> {
        let src = &model.sources()[module];
        let root = src.statement(StmtId::ROOT);
        let root_node = EffNode {
            kind: root.kind().clone(),
            keyword: root.keyword().clone(),
            argument: root.argument().map(str::to_string),
            children: Vec::new(),
            parent: None,
            namespace: module,
            lexical: module,
            location: root.location().clone(),
            augmenting: false,
            added_by_uses: false,
            conditions: Vec::new(),
            effective_type: None,
        };

        let mut this = Self {
            model,
            tree: ModuleTree::new(module, root_node),
            uses_stack: Vec::new(),
            types: TypeResolver::new(model),
        };

        let mut scope = Scope::top(module);
        for &source in model.family(module) {
            let decl = &model.sources()[source];
            for &child in decl.statement(StmtId::ROOT).children() {
                let body = decl
                    .statement(child)
                    .statement_kind()
                    .map_or(true, |k| k.section() == Section::Body);
                if source != module && !body {
                    continue;
                }
                this.instantiate(source, child, &mut scope, ModuleTree::ROOT, module, false)?;
            }
        }

        trace!(module = %src.id(), nodes = this.tree.nodes.len(), "instantiated module");
        Ok(this.tree)
    }

    fn instantiate(
        &mut self,
        source: SourceIdx,
        stmt: StmtId,
        scope: &mut Scope,
        parent: NodeIdx,
        namespace: SourceIdx,
        added_by_uses: bool,
    ) -> Result<()> {
        let model = self.model;
        let decl = model.sources()[source].statement(stmt);

        if decl.is(StatementKind::Uses) {
            return self.expand_uses(source, stmt, scope, parent, namespace);
        }

        let effective_type = if decl.is(StatementKind::Type) && !self.tree.node(parent).is(StatementKind::Type) {
            Some(self.types.resolve(source, stmt, scope)?)
        } else {
            None
        };

        let node = self.tree.add(
            parent,
            EffNode {
                kind: decl.kind().clone(),
                keyword: decl.keyword().clone(),
                argument: decl.argument().map(str::to_string),
                children: Vec::new(),
                parent: None,
                namespace,
                lexical: source,
                location: decl.location().clone(),
                augmenting: false,
                added_by_uses,
                conditions: Vec::new(),
                effective_type,
            },
        );

        scope.push(source, stmt);
        for &child in decl.children() {
            self.instantiate(source, child, scope, node, namespace, added_by_uses)?;
        }
        scope.pop();
        Ok(())
    }

    fn expand_uses(
        &mut self,
        source: SourceIdx,
        stmt: StmtId,
        scope: &mut Scope,
        parent: NodeIdx,
        namespace: SourceIdx,
    ) -> Result<()> {
        let model = self.model;
        let src = &model.sources()[source];
        let decl = src.statement(stmt);
        let name = decl.argument().unwrap_or_default();

        let def = find_definition(model, source, name, scope, StatementKind::Grouping, decl.location())?;
        let key = (def.source, def.stmt);
        let owner = &model.sources()[model.owner(def.source)];
        let qualified = format!(
            "{}:{}",
            owner.id().name(),
            model.sources()[def.source].statement(def.stmt).argument().unwrap_or_default()
        );

        if let Some(start) = self.uses_stack.iter().position(|(k, _)| *k == key) {
            let mut cycle: Vec<String> = self.uses_stack[start..].iter().map(|(_, n)| n.clone()).collect();
            cycle.push(qualified);
            return Err(ReactorError::GroupingCycle {
                source_id: src.id().clone(),
                location: decl.location().clone(),
                cycle,
            });
        }

        trace!(grouping = %qualified, at = %decl.location(), "expanding uses");
        let first_new = self.tree.node(parent).children.len();

        self.uses_stack.push((key, qualified));
        let mut grouping_scope = def.scope.with(def.source, def.stmt);
        let grouping = model.sources()[def.source].statement(def.stmt);
        for &child in grouping.children() {
            if is_instantiable(model.sources()[def.source].statement(child).kind()) {
                self.instantiate(def.source, child, &mut grouping_scope, parent, namespace, true)?;
            }
        }
        self.uses_stack.pop();

        let added: Vec<NodeIdx> = self.tree.node(parent).children[first_new..].to_vec();
        let conditions = conditions_of(model, source, stmt);
        if !conditions.is_empty() {
            for &node in &added {
                self.tree.node_mut(node).conditions.extend(conditions.iter().cloned());
            }
        }

        for refine in src.children_of_kind(stmt, StatementKind::Refine) {
            self.apply_refine(source, refine, &added, scope, namespace)?;
        }
        for augment in src.children_of_kind(stmt, StatementKind::Augment) {
            self.apply_uses_augment(source, augment, &added, scope, namespace)?;
        }
        Ok(())
    }

    /// Resolve a relative schema node identifier against freshly used nodes
    fn find_relative(&self, roots: &[NodeIdx], path: &str) -> Option<NodeIdx> {
        let steps = parse_path(path, false)?;
        let (first, rest) = steps.split_first()?;
        let mut current = roots
            .iter()
            .copied()
            .find(|&n| self.tree.node(n).is_schema_node() && self.tree.node(n).schema_name() == first.name)?;
        for step in rest {
            current = self.tree.find_schema_child(current, None, &step.name)?;
        }
        Some(current)
    }

    fn apply_refine(
        &mut self,
        source: SourceIdx,
        refine: StmtId,
        added: &[NodeIdx],
        scope: &mut Scope,
        namespace: SourceIdx,
    ) -> Result<()> {
        let model = self.model;
        let src = &model.sources()[source];
        let decl = src.statement(refine);
        let path = decl.argument().unwrap_or_default();

        let target = self.find_relative(added, path).ok_or_else(|| ReactorError::RefineTarget {
            source_id: src.id().clone(),
            location: decl.location().clone(),
            target: path.to_string(),
        })?;
        let target_kind = self.tree.node(target).statement_kind();
        trace!(target = path, "applying refine");

        for &property in decl.children() {
            let prop = src.statement(property);
            if let (Some(kind), Some(target_kind)) = (prop.statement_kind(), target_kind) {
                if target_kind.substatement(kind).is_none() {
                    return Err(ReactorError::cardinality(
                        src.id(),
                        prop.keyword(),
                        prop.location(),
                        format!("cannot refine '{}' of a {}", kind, target_kind),
                    ));
                }
                if refine_replaces(kind, target_kind) {
                    for existing in self.tree.children_of_kind(target, kind) {
                        self.tree.detach(existing);
                    }
                }
            }
            self.instantiate(source, property, scope, target, namespace, true)?;
        }
        Ok(())
    }

    fn apply_uses_augment(
        &mut self,
        source: SourceIdx,
        augment: StmtId,
        added: &[NodeIdx],
        scope: &mut Scope,
        namespace: SourceIdx,
    ) -> Result<()> {
        let model = self.model;
        let src = &model.sources()[source];
        let decl = src.statement(augment);
        let path = decl.argument().unwrap_or_default();
        let error = |message: &str| ReactorError::AugmentTarget {
            source_id: src.id().clone(),
            location: decl.location().clone(),
            target: path.to_string(),
            message: message.to_string(),
        };

        let target = self.find_relative(added, path).ok_or_else(|| error("target node not found"))?;
        if !self.tree.node(target).statement_kind().is_some_and(|k| k.is_augmentable()) {
            return Err(error("target node cannot be augmented"));
        }

        let existing: Vec<NodeIdx> = self.tree.schema_children(target).collect();
        let first_new = self.tree.node(target).children.len();
        scope.push(source, augment);
        for &child in decl.children() {
            if is_augment_content(src.statement(child).kind()) {
                self.instantiate(source, child, scope, target, namespace, true)?;
            }
        }
        scope.pop();

        let conditions = conditions_of(model, source, augment);
        let new_nodes: Vec<NodeIdx> = self.tree.node(target).children[first_new..].to_vec();
        for &node in &new_nodes {
            let name = self.tree.node(node).schema_name().to_string();
            if existing.iter().any(|&e| self.tree.node(e).schema_name() == name) {
                return Err(error(&format!("target already contains '{}'", name)));
            }
            self.tree.node_mut(node).conditions.extend(conditions.iter().cloned());
            self.tree.for_each_in_subtree(node, &mut |n| n.augmenting = true);
        }
        Ok(())
    }
}
