//! Source repositories
//!
//! A repository maps [`SourceIdentifier`]s to source text. The reactor itself
//! never touches the file system; callers pick a repository and feed its
//! sources into a build session.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::identifier::SourceIdentifier;
use crate::source::YangSource;

/// Lookup of source text by identifier
pub trait SourceRepository {
    /// All identifiers this repository can serve, sorted
    fn identifiers(&self) -> Vec<SourceIdentifier>;

    /// Fetch and tokenize one source, `None` if unknown
    fn fetch(&self, id: &SourceIdentifier) -> Result<Option<YangSource>>;
}

/// Sources held in memory, keyed by identifier
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    sources: BTreeMap<SourceIdentifier, String>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SourceIdentifier, text: impl Into<String>) {
        self.sources.insert(id, text.into());
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SourceRepository for InMemoryRepository {
    fn identifiers(&self) -> Vec<SourceIdentifier> {
        self.sources.keys().cloned().collect()
    }

    fn fetch(&self, id: &SourceIdentifier) -> Result<Option<YangSource>> {
        self.sources
            .get(id)
            .map(|text| YangSource::from_text(id.to_file_name(), text))
            .transpose()
    }
}

/// Sources stored as canonically named files below a directory
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
    files: BTreeMap<SourceIdentifier, PathBuf>,
}

impl DirectoryRepository {
    /// Index every `<name>[@<revision>].<extension>` file below `root`
    pub fn open(root: impl AsRef<Path>, config: &RepositoryConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = BTreeMap::new();

        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map(|e| e != config.extension.as_str()).unwrap_or(true) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let id = if config.lenient_revisions {
                SourceIdentifier::from_file_name_lenient_with_extension(file_name, &config.extension)?
            } else {
                SourceIdentifier::from_file_name_with_extension(file_name, &config.extension)?
            };

            if let Some(previous) = files.insert(id.clone(), path.to_path_buf()) {
                warn!(source = %id, shadowed = %previous.display(), "duplicate source file");
            }
        }

        debug!(root = %root.display(), sources = files.len(), "indexed source directory");
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &SourceIdentifier) -> Option<&Path> {
        self.files.get(id).map(PathBuf::as_path)
    }
}

impl SourceRepository for DirectoryRepository {
    fn identifiers(&self) -> Vec<SourceIdentifier> {
        self.files.keys().cloned().collect()
    }

    fn fetch(&self, id: &SourceIdentifier) -> Result<Option<YangSource>> {
        let Some(path) = self.files.get(id) else {
            return Ok(None);
        };
        let text = fs::read_to_string(path)?;
        YangSource::from_text(path.display().to_string(), &text).map(Some)
    }
}
