//! Cross-source inference reactor
//!
//! A [`BuildSession`] collects sources and drives them through the ordered
//! phases. Every phase is applied to all sources before the next one starts,
//! so a phase may read anything earlier phases produced for any source.

pub mod declaration;
pub mod declared;
pub mod definition;
pub mod linkage;

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info, info_span};

use crate::config::{ReactorConfig, ReactorSettings};
use crate::context::SchemaContext;
use crate::effective;
use crate::error::Result;
use crate::repository::SourceRepository;
use crate::source::YangSource;

pub use declared::{DeclaredKind, DeclaredModel, DeclaredSource, DeclaredStatement, StmtId};
pub use linkage::{LinkKind, ModuleGraph, SourceKind};

/// Position of a source in the identifier-sorted source list of a build
pub(crate) type SourceIdx = usize;

/// Build phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    PreLinkage,
    Linkage,
    StatementDefinition,
    FullDeclaration,
    EffectiveModel,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::PreLinkage,
        Phase::Linkage,
        Phase::StatementDefinition,
        Phase::FullDeclaration,
        Phase::EffectiveModel,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreLinkage => "PRE_LINKAGE",
            Self::Linkage => "LINKAGE",
            Self::StatementDefinition => "STATEMENT_DEFINITION",
            Self::FullDeclaration => "FULL_DECLARATION",
            Self::EffectiveModel => "EFFECTIVE_MODEL",
        };
        f.write_str(name)
    }
}

/// Apply `f` to every item, on the rayon pool when `parallel` is set.
///
/// Errors are reported in item order regardless of scheduling.
pub(crate) fn map_items<T, U, F>(parallel: bool, items: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> Result<U> + Sync + Send,
{
    let results: Vec<Result<U>> = if parallel {
        items.par_iter().enumerate().map(|(i, item)| f(i, item)).collect()
    } else {
        items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
    };
    results.into_iter().collect()
}

/// One build: a set of sources and the settings to process them with
#[derive(Debug, Clone, Default)]
pub struct BuildSession {
    sources: Vec<YangSource>,
    settings: ReactorSettings,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ReactorConfig) -> Self {
        Self {
            sources: Vec::new(),
            settings: config.reactor.clone(),
        }
    }

    pub fn settings(&self) -> &ReactorSettings {
        &self.settings
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn add_source(&mut self, source: YangSource) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn add_sources(&mut self, sources: impl IntoIterator<Item = YangSource>) -> &mut Self {
        self.sources.extend(sources);
        self
    }

    /// Add every source a repository serves
    pub fn add_repository(&mut self, repository: &impl SourceRepository) -> Result<&mut Self> {
        for id in repository.identifiers() {
            if let Some(source) = repository.fetch(&id)? {
                self.sources.push(source);
            }
        }
        Ok(self)
    }

    /// Run the declaration phases only
    pub fn build_declared(self) -> Result<DeclaredModel> {
        let _build = info_span!("build", sources = self.sources.len()).entered();
        let parallel = self.settings.parallel;

        let headers = {
            let _phase = info_span!("phase", phase = %Phase::PreLinkage).entered();
            map_items(parallel, &self.sources, |_, source| linkage::read_header(source))?
        };

        let mut pairs: Vec<_> = headers.into_iter().zip(self.sources).collect();
        pairs.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        let (headers, sources): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();

        let linkage = {
            let _phase = info_span!("phase", phase = %Phase::Linkage).entered();
            linkage::link(&headers)?
        };

        let roots: Vec<_> = sources.into_iter().map(YangSource::into_root).collect();

        let bound = {
            let _phase = info_span!("phase", phase = %Phase::StatementDefinition).entered();
            let root_refs: Vec<_> = roots.iter().collect();
            let catalog = definition::ExtensionCatalog::collect(&root_refs, &linkage);
            map_items(parallel, &roots, |idx, root| {
                let bound = definition::bind_source(idx, root, &headers, &linkage, &catalog)?;
                debug!(source = %headers[idx].id, statements = bound.len(), "bound statements");
                Ok(bound)
            })?
        };

        let sources = {
            let _phase = info_span!("phase", phase = %Phase::FullDeclaration).entered();
            let inputs: Vec<_> = headers.into_iter().zip(bound).collect();
            let enforce_order = self.settings.enforce_statement_order;
            let linkage = &linkage;
            let ids: Vec<_> = inputs.iter().map(|(h, _)| h.id.clone()).collect();
            let checked = map_items(parallel, &inputs, |idx, (header, statements)| {
                declaration::Checker {
                    id: &header.id,
                    statements,
                    prefixes: &linkage.sources[idx].prefixes,
                    enforce_order,
                }
                .check()
            })?;
            debug!(sources = checked.len(), "declared sources");

            inputs
                .into_iter()
                .enumerate()
                .map(|(idx, (header, statements))| DeclaredSource {
                    header,
                    statements,
                    prefixes: linkage.sources[idx]
                        .prefixes
                        .iter()
                        .map(|(prefix, &target)| (prefix.clone(), ids[target].clone()))
                        .collect(),
                })
                .collect()
        };

        Ok(DeclaredModel { sources, linkage })
    }

    /// Run every phase and freeze the result
    pub fn build_effective(self) -> Result<SchemaContext> {
        let parallel = self.settings.parallel;
        let model = self.build_declared()?;

        let _phase = info_span!("phase", phase = %Phase::EffectiveModel).entered();
        let context = effective::build(&model, parallel)?;
        info!(modules = context.modules().len(), "schema context ready");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::stmt::StatementKind;

    fn session(texts: &[&str]) -> BuildSession {
        let mut session = BuildSession::new();
        for (i, text) in texts.iter().enumerate() {
            session.add_source(YangSource::from_text(format!("src{}", i), text).unwrap());
        }
        session
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::PreLinkage < Phase::EffectiveModel);
        assert_eq!(Phase::ALL[2].to_string(), "STATEMENT_DEFINITION");
    }

    #[test]
    fn test_declared_model_is_sorted_and_bound() {
        let model = session(&[
            "module b { namespace urn:b; prefix b; container c { leaf x { type string; } } }",
            "module a { namespace urn:a; prefix a; import b { prefix bb; } }",
        ])
        .build_declared()
        .unwrap();

        let names: Vec<_> = model.sources().iter().map(|s| s.id().name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let b = &model.sources()[1];
        let container = b.first_child(b.root(), StatementKind::Container).unwrap();
        assert_eq!(b.statement(container).argument(), Some("c"));
        assert_eq!(model.sources()[0].resolve_prefix("bb").map(|id| id.name()), Some("b"));
    }

    #[test]
    fn test_unknown_keyword_fails() {
        let err = session(&["module a { namespace urn:a; prefix a; frobnicate x; }"])
            .build_declared()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStatement);
    }

    #[test]
    fn test_yang_1_1_keyword_needs_version() {
        let err = session(&["module a { namespace urn:a; prefix a; anydata d; }"])
            .build_declared()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStatement);

        session(&["module a { yang-version 1.1; namespace urn:a; prefix a; anydata d; }"])
            .build_declared()
            .unwrap();
    }

    #[test]
    fn test_extension_instance_binding() {
        let model = session(&[
            "module ext { namespace urn:e; prefix e; extension marker { argument name; } }",
            "module a { namespace urn:a; prefix a; import ext { prefix e; } \
             container c { e:marker \"yes\" { anything goes; } } }",
        ])
        .build_declared()
        .unwrap();
        let a = &model.sources()[0];
        let container = a.first_child(a.root(), StatementKind::Container).unwrap();
        let marker = a.statement(a.statement(container).children()[0]);
        assert!(matches!(marker.kind(), DeclaredKind::Extension { name, .. } if name == "marker"));
        assert_eq!(a.statement(marker.children()[0]).kind(), &DeclaredKind::Opaque);

        let err = session(&[
            "module ext { namespace urn:e; prefix e; }",
            "module a { namespace urn:a; prefix a; import ext { prefix e; } e:marker; }",
        ])
        .build_declared()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownStatement);
    }

    #[test]
    fn test_cardinality_violations() {
        for text in [
            "module a { namespace urn:a; prefix a; leaf x { type string; type int8; } }",
            "module a { namespace urn:a; prefix a; leaf x; }",
            "module a { namespace urn:a; prefix a; leaf x { type string; config maybe; } }",
            "module a { namespace urn:a; prefix a; container c { type string; } }",
            "module a { namespace urn:a; prefix a; container; }",
        ] {
            let err = session(&[text]).build_declared().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Cardinality, "{}", text);
        }
    }

    #[test]
    fn test_section_order_is_configurable() {
        let text = "module a { namespace urn:a; prefix a; container c; import b { prefix b; } }";
        let b = "module b { namespace urn:b; prefix b; }";
        let err = session(&[text, b]).build_declared().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cardinality);

        let mut config = ReactorConfig::default();
        config.reactor.enforce_statement_order = false;
        let mut relaxed = BuildSession::with_config(&config);
        relaxed.add_source(YangSource::from_text("a", text).unwrap());
        relaxed.add_source(YangSource::from_text("b", b).unwrap());
        relaxed.build_declared().unwrap();
    }

    #[test]
    fn test_unknown_prefix_is_linkage_error() {
        let err = session(&["module a { namespace urn:a; prefix a; uses x:g; }"])
            .build_declared()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Linkage);
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let texts = [
            "module a { namespace urn:a; prefix a; import b { prefix b; } }",
            "module b { namespace urn:b; prefix b; leaf x { type string; } }",
        ];
        let parallel = session(&texts).build_declared().unwrap();
        let mut config = ReactorConfig::default();
        config.reactor.parallel = false;
        let mut seq = BuildSession::with_config(&config);
        for text in texts {
            seq.add_source(YangSource::from_text("t", text).unwrap());
        }
        let sequential = seq.build_declared().unwrap();
        assert_eq!(
            parallel.sources()[1].statement_count(),
            sequential.sources()[1].statement_count()
        );
    }
}
