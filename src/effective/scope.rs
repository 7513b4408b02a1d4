//! Lexical scopes for grouping and typedef lookup, and schema node paths

use crate::error::{ReactorError, Result};
use crate::reactor::{DeclaredModel, SourceIdx, StmtId};
use crate::stmt::{StatementKind, StatementLocation};

/// A statement whose children are visible definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    pub source: SourceIdx,
    pub stmt: StmtId,
}

/// Enclosing statements, innermost last, above a module's top level
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    pub module: SourceIdx,
    pub frames: Vec<Frame>,
}

/// Where a grouping or typedef was found, with the scope it was defined in
#[derive(Debug, Clone)]
pub(crate) struct Definition {
    pub source: SourceIdx,
    pub stmt: StmtId,
    pub scope: Scope,
}

impl Scope {
    pub fn top(module: SourceIdx) -> Self {
        Self {
            module,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, source: SourceIdx, stmt: StmtId) {
        self.frames.push(Frame { source, stmt });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn with(&self, source: SourceIdx, stmt: StmtId) -> Self {
        let mut scope = self.clone();
        scope.push(source, stmt);
        scope
    }
}

fn find_among(
    model: &DeclaredModel,
    frame: Frame,
    kind: StatementKind,
    name: &str,
) -> Option<StmtId> {
    let source = &model.sources()[frame.source];
    source
        .children_of_kind(frame.stmt, kind)
        .find(|&c| source.statement(c).argument() == Some(name))
}

fn find_top_level(model: &DeclaredModel, module: SourceIdx, kind: StatementKind, name: &str) -> Option<Definition> {
    model.family(module).iter().find_map(|&source| {
        let frame = Frame {
            source,
            stmt: StmtId::ROOT,
        };
        find_among(model, frame, kind, name).map(|stmt| Definition {
            source,
            stmt,
            scope: Scope::top(module),
        })
    })
}

/// Resolve a possibly prefixed grouping/typedef reference written in `source`.
///
/// Unprefixed names, and names carrying the referring module's own prefix,
/// are searched from the innermost enclosing statement out to the module top
/// level; other prefixed names only at the referenced module's top level.
pub(crate) fn find_definition(
    model: &DeclaredModel,
    source: SourceIdx,
    name: &str,
    scope: &Scope,
    kind: StatementKind,
    location: &StatementLocation,
) -> Result<Definition> {
    let reference = match kind {
        StatementKind::Grouping => "grouping",
        _ => "typedef",
    };
    let unresolved = || ReactorError::UnresolvedReference {
        source_id: model.sources()[source].id().clone(),
        location: location.clone(),
        reference,
        name: name.to_string(),
    };

    let (module, local) = match name.split_once(':') {
        Some((prefix, local)) => (Some(model.prefix_target(source, prefix).ok_or_else(unresolved)?), local),
        None => (None, name),
    };

    // the own module's prefix resolves like an unprefixed name
    if let Some(module) = module.filter(|&m| m != model.owner(source)) {
        return find_top_level(model, module, kind, local).ok_or_else(unresolved);
    }

    for (depth, &frame) in scope.frames.iter().enumerate().rev() {
        if let Some(stmt) = find_among(model, frame, kind, local) {
            return Ok(Definition {
                source: frame.source,
                stmt,
                scope: Scope {
                    module: scope.module,
                    frames: scope.frames[..=depth].to_vec(),
                },
            });
        }
    }
    find_top_level(model, scope.module, kind, local).ok_or_else(unresolved)
}

/// One `prefix:name` step of a schema node identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub prefix: Option<String>,
    pub name: String,
}

impl Step {
    pub fn display(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }
}

/// Split a schema node identifier into steps; `None` if it is empty or
/// its absolute/relative form does not match `absolute`.
pub(crate) fn parse_path(path: &str, absolute: bool) -> Option<Vec<Step>> {
    let path = path.trim();
    if path.starts_with('/') != absolute {
        return None;
    }
    let steps: Vec<Step> = path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.split_once(':') {
            Some((prefix, name)) => Step {
                prefix: Some(prefix.to_string()),
                name: name.to_string(),
            },
            None => Step {
                prefix: None,
                name: s.to_string(),
            },
        })
        .collect();
    (!steps.is_empty()).then_some(steps)
}
