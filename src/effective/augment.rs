//! Cross-module augmentation
//!
//! Modules are processed in dependency order: a module's augments run only
//! after every module owning a node on one of its target paths is done with
//! its own augments. Within a module, augments are retried in rounds so one
//! may target a node another one adds.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use tracing::{debug, trace};

use crate::error::{ReactorError, Result};
use crate::reactor::{DeclaredModel, SourceIdx};
use crate::stmt::StatementKind;

use super::instantiate::{conditions_of_node, is_augment_content};
use super::scope::{parse_path, Step};
use super::tree::{ModuleTree, NodeIdx};

/// Absolute path resolution over all module trees
pub(crate) struct Resolver<'a> {
    pub model: &'a DeclaredModel,
    /// Tree position of each module source
    pub positions: &'a BTreeMap<SourceIdx, usize>,
}

impl Resolver<'_> {
    /// Module a path step refers to, as seen from `lexical`
    pub fn step_module(&self, lexical: SourceIdx, step: &Step) -> Option<SourceIdx> {
        match &step.prefix {
            Some(prefix) => self.model.prefix_target(lexical, prefix),
            None => Some(self.model.owner(lexical)),
        }
    }

    /// Locate the node an absolute schema node identifier points at
    pub fn resolve(
        &self,
        trees: &[ModuleTree],
        lexical: SourceIdx,
        path: &str,
    ) -> std::result::Result<(usize, NodeIdx), String> {
        let steps = parse_path(path, true).ok_or_else(|| "malformed absolute path".to_string())?;
        let first_module = self
            .step_module(lexical, &steps[0])
            .ok_or_else(|| format!("unknown prefix in '{}'", steps[0].display()))?;
        let tree_pos = *self
            .positions
            .get(&first_module)
            .ok_or_else(|| "target module is not available".to_string())?;

        let tree = &trees[tree_pos];
        let mut current = ModuleTree::ROOT;
        for step in &steps {
            let module = self
                .step_module(lexical, step)
                .ok_or_else(|| format!("unknown prefix in '{}'", step.display()))?;
            current = tree
                .find_schema_child(current, Some(module), &step.name)
                .ok_or_else(|| format!("node '{}' not found", step.display()))?;
        }
        Ok((tree_pos, current))
    }
}

/// A top-level `augment` awaiting application
#[derive(Debug, Clone, Copy)]
struct PendingAugment {
    tree: usize,
    node: NodeIdx,
}

fn collect_augments(trees: &[ModuleTree]) -> BTreeMap<usize, Vec<PendingAugment>> {
    let mut out = BTreeMap::new();
    for (pos, tree) in trees.iter().enumerate() {
        let augments: Vec<_> = tree
            .children_of_kind(ModuleTree::ROOT, StatementKind::Augment)
            .into_iter()
            .map(|node| PendingAugment { tree: pos, node })
            .collect();
        if !augments.is_empty() {
            out.insert(pos, augments);
        }
    }
    out
}

/// Apply every top-level augment of every module
pub(crate) fn apply_all(resolver: &Resolver<'_>, trees: &mut [ModuleTree]) -> Result<()> {
    let mut pending = collect_augments(trees);
    if pending.is_empty() {
        return Ok(());
    }

    // module -> modules its augment paths pass through
    let mut dependencies: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for (&pos, augments) in &pending {
        let deps = dependencies.entry(pos).or_default();
        for augment in augments {
            let node = trees[pos].node(augment.node);
            let steps = parse_path(node.argument.as_deref().unwrap_or_default(), true).unwrap_or_default();
            for step in &steps {
                if let Some(module) = resolver.step_module(node.lexical, step) {
                    if let Some(&target) = resolver.positions.get(&module) {
                        if target != pos {
                            deps.insert(target);
                        }
                    }
                }
            }
        }
    }
    check_mutual(resolver, trees, &dependencies)?;

    let mut round = 0usize;
    while !pending.is_empty() {
        round += 1;
        let ready = ready_modules(&pending, &dependencies);

        // only reachable if a dependency cycle got past check_mutual
        if ready.is_empty() {
            return Err(ReactorError::UnresolvableDependency {
                blocked: pending
                    .keys()
                    .map(|&pos| resolver.model.sources()[trees[pos].module].id().clone())
                    .collect(),
            });
        }

        for pos in ready {
            if let Some(augments) = pending.remove(&pos) {
                debug!(
                    module = %resolver.model.sources()[trees[pos].module].id(),
                    augments = augments.len(),
                    round,
                    "applying augments"
                );
                apply_module(resolver, trees, augments)?;
            }
        }
    }
    Ok(())
}

/// Modules still waiting whose augment dependencies have all been applied
fn ready_modules<V>(waiting: &BTreeMap<usize, V>, dependencies: &BTreeMap<usize, BTreeSet<usize>>) -> Vec<usize> {
    waiting
        .keys()
        .copied()
        .filter(|pos| {
            dependencies
                .get(pos)
                .map_or(true, |deps| deps.iter().all(|d| !waiting.contains_key(d)))
        })
        .collect()
}

fn check_mutual(
    resolver: &Resolver<'_>,
    trees: &[ModuleTree],
    dependencies: &BTreeMap<usize, BTreeSet<usize>>,
) -> Result<()> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<_> = (0..trees.len()).map(|pos| graph.add_node(pos)).collect();
    for (&from, deps) in dependencies {
        for &to in deps {
            graph.add_edge(nodes[from], nodes[to], ());
        }
    }

    for scc in kosaraju_scc(&graph) {
        if scc.len() > 1 {
            let mut modules: Vec<_> = scc
                .iter()
                .map(|&n| resolver.model.sources()[trees[graph[n]].module].id().clone())
                .collect();
            modules.sort();
            return Err(ReactorError::EffectiveModel {
                modules,
                message: "modules augment each other".to_string(),
            });
        }
    }
    Ok(())
}

/// Apply one module's augments, retrying until no augment makes progress
fn apply_module(resolver: &Resolver<'_>, trees: &mut [ModuleTree], mut pending: Vec<PendingAugment>) -> Result<()> {
    loop {
        let before = pending.len();
        let mut failures = Vec::new();
        let mut still_pending = Vec::new();

        for augment in pending {
            let node = trees[augment.tree].node(augment.node);
            let path = node.argument.clone().unwrap_or_default();
            match resolver.resolve(trees, node.lexical, &path) {
                Ok((target_tree, target)) => splice(resolver, trees, augment, target_tree, target, &path)?,
                Err(message) => {
                    failures.push(message);
                    still_pending.push(augment);
                }
            }
        }

        if still_pending.is_empty() {
            return Ok(());
        }
        if still_pending.len() == before {
            let augment = still_pending[0];
            let node = trees[augment.tree].node(augment.node);
            return Err(ReactorError::AugmentTarget {
                source_id: resolver.model.sources()[node.lexical].id().clone(),
                location: node.location.clone(),
                target: node.argument.clone().unwrap_or_default(),
                message: failures.swap_remove(0),
            });
        }
        pending = still_pending;
    }
}

fn splice(
    resolver: &Resolver<'_>,
    trees: &mut [ModuleTree],
    augment: PendingAugment,
    target_tree: usize,
    target: NodeIdx,
    path: &str,
) -> Result<()> {
    let source_tree = &trees[augment.tree];
    let augment_node = source_tree.node(augment.node);
    let error = |message: String| ReactorError::AugmentTarget {
        source_id: resolver.model.sources()[augment_node.lexical].id().clone(),
        location: augment_node.location.clone(),
        target: path.to_string(),
        message,
    };

    let target_node = trees[target_tree].node(target);
    if !target_node.statement_kind().is_some_and(|k| k.is_augmentable()) {
        return Err(error(format!("'{}' cannot be augmented", target_node.keyword)));
    }

    let conditions = conditions_of_node(resolver.model, source_tree, augment.node);
    let mut copies = Vec::new();
    let mut names = BTreeSet::new();
    for &child in &augment_node.children {
        let node = source_tree.node(child);
        if !is_augment_content(&node.kind) {
            continue;
        }
        let clash = trees[target_tree]
            .find_schema_child(target, Some(node.namespace), node.schema_name())
            .is_some();
        if clash || !names.insert((node.namespace, node.schema_name())) {
            return Err(error(format!("target already contains '{}'", node.schema_name())));
        }
        copies.push(source_tree.snapshot(child));
    }

    trace!(target = path, nodes = copies.len(), "splicing augment");
    let tree = &mut trees[target_tree];
    for copy in copies {
        let root = tree.graft(target, copy);
        tree.for_each_in_subtree(root, &mut |n| n.augmenting = true);
        tree.node_mut(root).conditions.extend(conditions.iter().cloned());
    }
    Ok(())
}
