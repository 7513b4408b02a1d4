//! Pre-linkage and linkage
//!
//! Pre-linkage reads each source's own identity and its raw import/include
//! declarations without looking at any other source. Linkage then resolves
//! those declarations against the whole source set and builds the module
//! identity graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ReactorError, Result};
use crate::identifier::{Revision, SourceIdentifier};
use crate::source::YangSource;
use crate::stmt::{StatementLocation, StatementNode, YangVersion};

use super::SourceIdx;

/// Whether a source declares a module or a submodule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Module,
    Submodule,
}

/// `import` as declared, before resolution
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub module: String,
    pub prefix: String,
    pub revision: Option<Revision>,
    pub location: StatementLocation,
}

/// `include` as declared, before resolution
#[derive(Debug, Clone)]
pub struct IncludeDecl {
    pub submodule: String,
    pub revision: Option<Revision>,
    pub location: StatementLocation,
}

/// Everything a source says about itself
#[derive(Debug, Clone)]
pub struct SourceHeader {
    pub id: SourceIdentifier,
    pub kind: SourceKind,
    pub version: YangVersion,
    /// Module namespace, `None` for submodules
    pub namespace: Option<String>,
    /// Module prefix, or the belongs-to prefix of a submodule
    pub prefix: String,
    /// Name of the module a submodule belongs to
    pub belongs_to: Option<String>,
    pub imports: Vec<ImportDecl>,
    pub includes: Vec<IncludeDecl>,
    pub location: StatementLocation,
}

impl SourceHeader {
    /// Name of the module this source contributes to
    pub fn module_name(&self) -> &str {
        self.belongs_to.as_deref().unwrap_or(self.id.name())
    }
}

fn required_argument<'a>(
    id: &SourceIdentifier,
    stmt: &'a StatementNode,
) -> Result<&'a str> {
    stmt.argument().ok_or_else(|| {
        ReactorError::cardinality(id, &stmt.keyword, &stmt.location, "missing argument")
    })
}

fn required_child<'a>(
    id: &SourceIdentifier,
    stmt: &'a StatementNode,
    keyword: &str,
) -> Result<&'a StatementNode> {
    stmt.first_child(keyword).ok_or_else(|| {
        ReactorError::cardinality(
            id,
            &stmt.keyword,
            &stmt.location,
            format!("missing '{}' substatement", keyword),
        )
    })
}

fn revision_date(stmt: &StatementNode) -> Result<Option<Revision>> {
    stmt.first_child("revision-date")
        .and_then(StatementNode::argument)
        .map(Revision::parse)
        .transpose()
}

/// PRE_LINKAGE: read the identity of one source
pub(crate) fn read_header(source: &YangSource) -> Result<SourceHeader> {
    let root = source.root();
    let kind = match (root.keyword.prefix.as_deref(), root.keyword.identifier.as_str()) {
        (None, "module") => SourceKind::Module,
        (None, "submodule") => SourceKind::Submodule,
        _ => {
            return Err(ReactorError::Format(format!(
                "{}: root statement must be 'module' or 'submodule', found '{}'",
                source.origin(),
                root.keyword
            )))
        }
    };
    let name = root.argument().ok_or_else(|| {
        ReactorError::Format(format!("{}: {} has no name", source.origin(), root.keyword))
    })?;

    let mut revision = None;
    for rev in root.children_named("revision") {
        if let Some(text) = rev.argument() {
            revision = revision.max(Some(Revision::parse(text)?));
        }
    }
    let id = SourceIdentifier::new(name, revision);

    let version = root.declared_version().ok_or_else(|| {
        ReactorError::cardinality(
            &id,
            "yang-version",
            &root.location,
            "unsupported language version",
        )
    })?;

    let (namespace, prefix, belongs_to) = match kind {
        SourceKind::Module => {
            let namespace = required_argument(&id, required_child(&id, root, "namespace")?)?;
            let prefix = required_argument(&id, required_child(&id, root, "prefix")?)?;
            (Some(namespace.to_string()), prefix.to_string(), None)
        }
        SourceKind::Submodule => {
            let belongs = required_child(&id, root, "belongs-to")?;
            let module = required_argument(&id, belongs)?;
            let prefix = required_argument(&id, required_child(&id, belongs, "prefix")?)?;
            (None, prefix.to_string(), Some(module.to_string()))
        }
    };

    let mut imports = Vec::new();
    for import in root.children_named("import") {
        let module = required_argument(&id, import)?;
        let prefix = required_argument(&id, required_child(&id, import, "prefix")?)?;
        imports.push(ImportDecl {
            module: module.to_string(),
            prefix: prefix.to_string(),
            revision: revision_date(import)?,
            location: import.location.clone(),
        });
    }

    let mut includes = Vec::new();
    for include in root.children_named("include") {
        includes.push(IncludeDecl {
            submodule: required_argument(&id, include)?.to_string(),
            revision: revision_date(include)?,
            location: include.location.clone(),
        });
    }

    Ok(SourceHeader {
        id,
        kind,
        version,
        namespace,
        prefix,
        belongs_to,
        imports,
        includes,
        location: root.location.clone(),
    })
}

/// Kind of an edge in the module identity graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkKind {
    /// Source imports a module
    Import,
    /// Source includes a submodule
    Include,
    /// Submodule belongs to a module
    BelongsTo,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => write!(f, "import"),
            Self::Include => write!(f, "include"),
            Self::BelongsTo => write!(f, "belongs-to"),
        }
    }
}

/// Resolved import/include/belongs-to relations between sources
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    graph: DiGraph<SourceIdentifier, LinkKind>,
    nodes: BTreeMap<SourceIdentifier, NodeIndex>,
}

impl ModuleGraph {
    fn add_source(&mut self, id: &SourceIdentifier) {
        let idx = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), idx);
    }

    fn link(&mut self, from: &SourceIdentifier, to: &SourceIdentifier, kind: LinkKind) {
        if let (Some(&a), Some(&b)) = (self.nodes.get(from), self.nodes.get(to)) {
            self.graph.update_edge(a, b, kind);
        }
    }

    /// All sources, in identifier order
    pub fn sources(&self) -> impl Iterator<Item = &SourceIdentifier> {
        self.nodes.keys()
    }

    pub fn source_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Targets of `id`'s outgoing links of the given kind, sorted
    pub fn links_from(&self, id: &SourceIdentifier, kind: LinkKind) -> Vec<&SourceIdentifier> {
        self.neighbors(id, kind, Direction::Outgoing)
    }

    /// Sources linking to `id` with the given kind, sorted
    pub fn links_to(&self, id: &SourceIdentifier, kind: LinkKind) -> Vec<&SourceIdentifier> {
        self.neighbors(id, kind, Direction::Incoming)
    }

    pub fn imports_of(&self, id: &SourceIdentifier) -> Vec<&SourceIdentifier> {
        self.links_from(id, LinkKind::Import)
    }

    pub fn includes_of(&self, id: &SourceIdentifier) -> Vec<&SourceIdentifier> {
        self.links_from(id, LinkKind::Include)
    }

    pub fn importers_of(&self, id: &SourceIdentifier) -> Vec<&SourceIdentifier> {
        self.links_to(id, LinkKind::Import)
    }

    fn neighbors(&self, id: &SourceIdentifier, kind: LinkKind, direction: Direction) -> Vec<&SourceIdentifier> {
        let Some(&idx) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&SourceIdentifier> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == kind)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other)
            })
            .collect();
        out.sort();
        out
    }

    /// Export the graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph ModuleGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=rounded, fontname=\"Helvetica\", fontsize=10];\n\n");

        for id in self.nodes.keys() {
            output.push_str(&format!("  \"{}\";\n", id));
        }
        output.push('\n');

        let mut edges: Vec<(String, String, LinkKind)> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let from = self.graph.node_weight(e.source())?;
                let to = self.graph.node_weight(e.target())?;
                Some((from.to_string(), to.to_string(), *e.weight()))
            })
            .collect();
        edges.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        for (from, to, kind) in edges {
            let style = match kind {
                LinkKind::Import => "solid",
                LinkKind::Include => "bold",
                LinkKind::BelongsTo => "dashed",
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\", style={}];\n",
                from, to, kind, style
            ));
        }

        output.push_str("}\n");
        output
    }
}

/// Resolved linkage of one source
#[derive(Debug, Clone)]
pub(crate) struct LinkedSource {
    /// The module this source contributes to (itself for modules)
    pub module: SourceIdx,
    /// Prefix table: own prefix and import prefixes to module sources
    pub prefixes: BTreeMap<String, SourceIdx>,
}

/// Output of the LINKAGE phase
#[derive(Debug, Clone)]
pub(crate) struct Linkage {
    pub sources: Vec<LinkedSource>,
    /// For each module: itself followed by all transitively included submodules
    pub families: BTreeMap<SourceIdx, Vec<SourceIdx>>,
    pub graph: ModuleGraph,
}

/// Pick the source of `name` matching `revision`, or the latest one
fn select(
    candidates: Option<&Vec<SourceIdx>>,
    headers: &[SourceHeader],
    revision: Option<Revision>,
) -> Option<SourceIdx> {
    let candidates = candidates?;
    match revision {
        Some(rev) => candidates
            .iter()
            .copied()
            .find(|&i| headers[i].id.revision() == Some(rev)),
        None => candidates.iter().copied().max_by(|&a, &b| headers[a].id.cmp(&headers[b].id)),
    }
}

fn describe(name: &str, revision: Option<Revision>) -> String {
    SourceIdentifier::new(name, revision).to_string()
}

/// LINKAGE: resolve every source's imports and includes.
///
/// `headers` must be sorted by identifier.
pub(crate) fn link(headers: &[SourceHeader]) -> Result<Linkage> {
    for pair in headers.windows(2) {
        if pair[0].id == pair[1].id {
            return Err(ReactorError::linkage(
                &pair[1].id,
                format!("source registered twice ({} and {})", pair[0].location, pair[1].location),
            ));
        }
    }

    let mut modules: BTreeMap<&str, Vec<SourceIdx>> = BTreeMap::new();
    let mut submodules: BTreeMap<&str, Vec<SourceIdx>> = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        match header.kind {
            SourceKind::Module => modules.entry(header.id.name()).or_default().push(idx),
            SourceKind::Submodule => submodules.entry(header.id.name()).or_default().push(idx),
        }
    }

    let mut graph = ModuleGraph::default();
    for header in headers {
        graph.add_source(&header.id);
    }

    // imports and includes
    let mut imports: Vec<Vec<(String, SourceIdx)>> = Vec::with_capacity(headers.len());
    let mut includes: Vec<Vec<SourceIdx>> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut resolved = Vec::new();
        for import in &header.imports {
            let target = select(modules.get(import.module.as_str()), headers, import.revision)
                .ok_or_else(|| {
                    ReactorError::linkage(
                        &header.id,
                        format!(
                            "imported module {} not found (at {})",
                            describe(&import.module, import.revision),
                            import.location
                        ),
                    )
                })?;
            debug!(source = %header.id, target = %headers[target].id, "resolved import");
            graph.link(&header.id, &headers[target].id, LinkKind::Import);
            resolved.push((import.prefix.clone(), target));
        }
        imports.push(resolved);

        let mut included = Vec::new();
        for include in &header.includes {
            let target = select(submodules.get(include.submodule.as_str()), headers, include.revision)
                .ok_or_else(|| {
                    ReactorError::linkage(
                        &header.id,
                        format!(
                            "included submodule {} not found (at {})",
                            describe(&include.submodule, include.revision),
                            include.location
                        ),
                    )
                })?;
            let owner = headers[target].module_name();
            if owner != header.module_name() {
                return Err(ReactorError::linkage(
                    &header.id,
                    format!(
                        "submodule {} belongs to '{}', not '{}' (at {})",
                        headers[target].id,
                        owner,
                        header.module_name(),
                        include.location
                    ),
                ));
            }
            graph.link(&header.id, &headers[target].id, LinkKind::Include);
            included.push(target);
        }
        includes.push(included);
    }

    check_include_cycles(headers, &includes)?;

    // module families
    let mut families = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.kind != SourceKind::Module {
            continue;
        }
        let mut members = BTreeSet::new();
        let mut stack = includes[idx].clone();
        while let Some(sub) = stack.pop() {
            if members.insert(sub) {
                stack.extend(includes[sub].iter().copied());
            }
        }
        let mut family = vec![idx];
        family.extend(members);
        families.insert(idx, family);
    }

    // owners and prefix tables
    let mut sources = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let module = match header.kind {
            SourceKind::Module => idx,
            SourceKind::Submodule => {
                let including = families
                    .iter()
                    .filter(|(_, family)| family.contains(&idx))
                    .map(|(&m, _)| m)
                    .max_by(|&a, &b| headers[a].id.cmp(&headers[b].id));
                let owner_name = header.module_name();
                let owner = including
                    .or_else(|| select(modules.get(owner_name), headers, None))
                    .ok_or_else(|| {
                        ReactorError::linkage(
                            &header.id,
                            format!("belongs-to module '{}' not found", owner_name),
                        )
                    })?;
                if including.is_none() {
                    warn!(submodule = %header.id, module = %headers[owner].id, "submodule is not included by any module");
                }
                graph.link(&header.id, &headers[owner].id, LinkKind::BelongsTo);
                owner
            }
        };

        let mut prefixes = BTreeMap::new();
        prefixes.insert(header.prefix.clone(), module);
        for (prefix, target) in &imports[idx] {
            if prefixes.insert(prefix.clone(), *target).is_some() {
                return Err(ReactorError::linkage(
                    &header.id,
                    format!("prefix '{}' is bound more than once", prefix),
                ));
            }
        }

        sources.push(LinkedSource { module, prefixes });
    }

    Ok(Linkage {
        sources,
        families,
        graph,
    })
}

fn check_include_cycles(headers: &[SourceHeader], includes: &[Vec<SourceIdx>]) -> Result<()> {
    let mut graph: DiGraph<SourceIdx, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..headers.len()).map(|i| graph.add_node(i)).collect();
    for (from, targets) in includes.iter().enumerate() {
        for &to in targets {
            graph.add_edge(nodes[from], nodes[to], ());
        }
    }

    for scc in kosaraju_scc(&graph) {
        let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if !cyclic {
            continue;
        }
        let mut members: Vec<&SourceIdentifier> = scc.iter().map(|&n| &headers[graph[n]].id).collect();
        members.sort();
        return Err(ReactorError::linkage(
            members[0],
            format!(
                "include cycle: {}",
                members.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" -> ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn headers(texts: &[&str]) -> Vec<SourceHeader> {
        let mut out: Vec<SourceHeader> = texts
            .iter()
            .map(|t| read_header(&YangSource::from_text("test", t).unwrap()).unwrap())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    #[test]
    fn test_read_header_module() {
        let h = &headers(&[r#"module a {
            yang-version 1.1;
            namespace "urn:a"; prefix a;
            import b { prefix bb; revision-date 2020-01-01; }
            revision 2019-01-01; revision 2021-06-30;
        }"#])[0];
        assert_eq!(h.id.to_string(), "a@2021-06-30");
        assert_eq!(h.kind, SourceKind::Module);
        assert_eq!(h.version, YangVersion::V1_1);
        assert_eq!(h.namespace.as_deref(), Some("urn:a"));
        assert_eq!(h.imports[0].prefix, "bb");
        assert_eq!(h.imports[0].revision.map(|r| r.to_string()).as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_read_header_rejects_non_module() {
        let source = YangSource::from_text("x", "container c;").unwrap();
        assert_eq!(read_header(&source).unwrap_err().kind(), ErrorKind::Format);

        let source = YangSource::from_text("x", "module m { prefix m; }").unwrap();
        assert_eq!(read_header(&source).unwrap_err().kind(), ErrorKind::Cardinality);
    }

    #[test]
    fn test_unqualified_import_prefers_present_revision() {
        let hs = headers(&[
            "module m { namespace urn:m; prefix m; }",
            "module m { namespace urn:m; prefix m; revision 2020-01-01; }",
            "module user { namespace urn:u; prefix u; import m { prefix m; } }",
        ]);
        let linkage = link(&hs).unwrap();
        let user = hs.iter().position(|h| h.id.name() == "user").unwrap();
        let target = linkage.sources[user].prefixes["m"];
        assert_eq!(hs[target].id.to_string(), "m@2020-01-01");
    }

    #[test]
    fn test_missing_import_fails() {
        let hs = headers(&["module a { namespace urn:a; prefix a; import zz { prefix z; } }"]);
        assert_eq!(link(&hs).unwrap_err().kind(), ErrorKind::Linkage);
    }

    #[test]
    fn test_exact_revision_import_must_exist() {
        let hs = headers(&[
            "module m { namespace urn:m; prefix m; revision 2020-01-01; }",
            "module a { namespace urn:a; prefix a; import m { prefix m; revision-date 2019-01-01; } }",
        ]);
        assert_eq!(link(&hs).unwrap_err().kind(), ErrorKind::Linkage);
    }

    #[test]
    fn test_mutual_import_is_allowed() {
        let hs = headers(&[
            "module a { namespace urn:a; prefix a; import b { prefix b; } }",
            "module b { namespace urn:b; prefix b; import a { prefix a; } }",
        ]);
        let linkage = link(&hs).unwrap();
        assert_eq!(linkage.graph.imports_of(&hs[0].id), vec![&hs[1].id]);
        assert_eq!(linkage.graph.importers_of(&hs[0].id), vec![&hs[1].id]);
    }

    #[test]
    fn test_include_must_belong_to_module() {
        let hs = headers(&[
            "module a { namespace urn:a; prefix a; include s; }",
            "module b { namespace urn:b; prefix b; }",
            "submodule s { belongs-to b { prefix b; } }",
        ]);
        assert_eq!(link(&hs).unwrap_err().kind(), ErrorKind::Linkage);
    }

    #[test]
    fn test_include_cycle_fails() {
        let hs = headers(&[
            "module a { namespace urn:a; prefix a; include s1; }",
            "submodule s1 { belongs-to a { prefix a; } include s2; }",
            "submodule s2 { belongs-to a { prefix a; } include s1; }",
        ]);
        let err = link(&hs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Linkage);
        assert!(err.to_string().contains("include cycle"));
    }

    #[test]
    fn test_family_and_submodule_prefix() {
        let hs = headers(&[
            "module a { namespace urn:a; prefix a; include s1; }",
            "submodule s1 { belongs-to a { prefix x; } include s2; }",
            "submodule s2 { belongs-to a { prefix y; } }",
        ]);
        let linkage = link(&hs).unwrap();
        assert_eq!(linkage.families[&0], vec![0, 1, 2]);
        assert_eq!(linkage.sources[2].prefixes["y"], 0);
        assert!(linkage.graph.to_dot().contains("belongs-to"));
    }

    #[test]
    fn test_duplicate_prefix_fails() {
        let hs = headers(&[
            "module a { namespace urn:a; prefix a; import b { prefix a; } }",
            "module b { namespace urn:b; prefix b; }",
        ]);
        assert_eq!(link(&hs).unwrap_err().kind(), ErrorKind::Linkage);
    }
}
