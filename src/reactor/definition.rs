//! STATEMENT_DEFINITION: bind every keyword to a statement definition

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::error::{ReactorError, Result};
use crate::identifier::SourceIdentifier;
use crate::stmt::{StatementKind, StatementNode, YangVersion};

use super::declared::{DeclaredKind, DeclaredStatement, StmtId};
use super::linkage::{Linkage, SourceHeader};
use super::SourceIdx;

/// Extensions declared by each module (including its submodules)
#[derive(Debug, Default)]
pub(crate) struct ExtensionCatalog {
    declared: BTreeSet<(SourceIdx, String)>,
}

impl ExtensionCatalog {
    pub fn collect(roots: &[&StatementNode], linkage: &Linkage) -> Self {
        let mut declared = BTreeSet::new();
        for (idx, root) in roots.iter().enumerate() {
            let module = linkage.sources[idx].module;
            for ext in root.children_named("extension") {
                if let Some(name) = ext.argument() {
                    declared.insert((module, name.to_string()));
                }
            }
        }
        Self { declared }
    }

    fn contains(&self, module: SourceIdx, name: &str) -> bool {
        self.declared.contains(&(module, name.to_string()))
    }
}

struct Binder<'a> {
    id: &'a SourceIdentifier,
    version: YangVersion,
    prefixes: &'a BTreeMap<String, SourceIdx>,
    headers: &'a [SourceHeader],
    catalog: &'a ExtensionCatalog,
    out: Vec<DeclaredStatement>,
}

impl Binder<'_> {
    fn kind_of(&self, node: &StatementNode) -> Result<DeclaredKind> {
        let unknown = || ReactorError::UnknownStatement {
            source_id: self.id.clone(),
            keyword: node.keyword.to_string(),
            location: node.location.clone(),
        };

        match &node.keyword.prefix {
            None => StatementKind::from_keyword(&node.keyword.identifier, self.version)
                .map(DeclaredKind::Statement)
                .ok_or_else(unknown),
            Some(prefix) => match self.prefixes.get(prefix) {
                Some(&module) if self.catalog.contains(module, &node.keyword.identifier) => {
                    trace!(source = %self.id, keyword = %node.keyword, "bound extension instance");
                    Ok(DeclaredKind::Extension {
                        module: self.headers[module].id.clone(),
                        name: node.keyword.identifier.clone(),
                    })
                }
                _ => Err(unknown()),
            },
        }
    }

    fn bind(&mut self, node: &StatementNode, parent: Option<StmtId>, opaque: bool) -> Result<StmtId> {
        let kind = if opaque {
            DeclaredKind::Opaque
        } else {
            self.kind_of(node)?
        };
        let nested_opaque = !matches!(kind, DeclaredKind::Statement(_));

        let id = StmtId(self.out.len());
        self.out.push(DeclaredStatement {
            kind,
            keyword: node.keyword.clone(),
            argument: node.argument.clone(),
            children: Vec::with_capacity(node.children.len()),
            parent,
            location: node.location.clone(),
        });

        for child in &node.children {
            let child_id = self.bind(child, Some(id), nested_opaque)?;
            self.out[id.0].children.push(child_id);
        }
        Ok(id)
    }
}

/// Bind one source's statement tree into a preorder arena rooted at [`StmtId::ROOT`]
pub(crate) fn bind_source(
    idx: SourceIdx,
    root: &StatementNode,
    headers: &[SourceHeader],
    linkage: &Linkage,
    catalog: &ExtensionCatalog,
) -> Result<Vec<DeclaredStatement>> {
    let header = &headers[idx];
    let mut binder = Binder {
        id: &header.id,
        version: header.version,
        prefixes: &linkage.sources[idx].prefixes,
        headers,
        catalog,
        out: Vec::new(),
    };
    binder.bind(root, None, false)?;
    Ok(binder.out)
}
