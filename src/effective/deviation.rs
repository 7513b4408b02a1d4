//! Deviations, applied after all augments in module identifier order

use tracing::trace;

use crate::error::{ReactorError, Result};
use crate::stmt::{Cardinality, StatementKind};

use super::augment::Resolver;
use super::tree::{ModuleTree, NodeIdx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deviate {
    NotSupported,
    Add,
    Replace,
    Delete,
}

impl Deviate {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "not-supported" => Some(Self::NotSupported),
            "add" => Some(Self::Add),
            "replace" => Some(Self::Replace),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

pub(crate) fn apply_all(resolver: &Resolver<'_>, trees: &mut [ModuleTree]) -> Result<()> {
    for pos in 0..trees.len() {
        for deviation in trees[pos].children_of_kind(ModuleTree::ROOT, StatementKind::Deviation) {
            apply(resolver, trees, pos, deviation)?;
        }
    }
    Ok(())
}

fn apply(resolver: &Resolver<'_>, trees: &mut [ModuleTree], pos: usize, deviation: NodeIdx) -> Result<()> {
    let node = trees[pos].node(deviation);
    let path = node.argument.clone().unwrap_or_default();
    let source_id = resolver.model.sources()[node.lexical].id().clone();
    let location = node.location.clone();
    let error = |message: String| ReactorError::Deviation {
        source_id: source_id.clone(),
        location: location.clone(),
        target: path.clone(),
        message,
    };

    let (target_tree, target) = resolver.resolve(trees, node.lexical, &path).map_err(&error)?;
    let target_kind = trees[target_tree]
        .node(target)
        .statement_kind()
        .ok_or_else(|| error("target is not a schema node".into()))?;

    let mut deviates = Vec::new();
    for idx in trees[pos].children_of_kind(deviation, StatementKind::Deviate) {
        let text = trees[pos].node(idx).argument.clone().unwrap_or_default();
        let op = Deviate::parse(&text).ok_or_else(|| error(format!("unknown deviate '{}'", text)))?;
        deviates.push((op, idx));
    }

    if deviates.iter().any(|(op, _)| *op == Deviate::NotSupported) {
        if deviates.len() > 1 {
            return Err(error("not-supported cannot be combined with other deviates".into()));
        }
        trace!(target = %path, "removing unsupported node");
        trees[target_tree].detach(target);
        return Ok(());
    }

    for (op, deviate) in deviates {
        let properties: Vec<NodeIdx> = trees[pos].node(deviate).children.clone();
        for property in properties {
            let prop = trees[pos].node(property);
            let Some(kind) = prop.statement_kind() else {
                continue;
            };
            let argument = prop.argument.clone();
            let cardinality = target_kind
                .substatement(kind)
                .ok_or_else(|| error(format!("'{}' does not apply to a {}", kind, target_kind)))?;
            let existing = trees[target_tree].children_of_kind(target, kind);

            match op {
                Deviate::Add => {
                    let single = matches!(cardinality, Cardinality::Optional | Cardinality::One);
                    if single && !existing.is_empty() {
                        return Err(error(format!("target already has '{}'", kind)));
                    }
                }
                Deviate::Replace => {
                    if existing.is_empty() {
                        return Err(error(format!("target has no '{}' to replace", kind)));
                    }
                    for idx in existing {
                        trees[target_tree].detach(idx);
                    }
                }
                Deviate::Delete => {
                    let matching = existing
                        .into_iter()
                        .find(|&idx| trees[target_tree].node(idx).argument == argument)
                        .ok_or_else(|| {
                            error(format!(
                                "target has no '{} {}' to delete",
                                kind,
                                argument.as_deref().unwrap_or_default()
                            ))
                        })?;
                    trees[target_tree].detach(matching);
                    continue;
                }
                Deviate::NotSupported => continue,
            }

            trace!(target = %path, property = %kind, "deviating property");
            let copy = trees[pos].snapshot(property);
            trees[target_tree].graft(target, copy);
        }
    }
    Ok(())
}
