//! Error types for the inference reactor

use std::fmt;

use thiserror::Error;

use crate::identifier::SourceIdentifier;
use crate::stmt::StatementLocation;

/// Result type for reactor operations
pub type Result<T> = std::result::Result<T, ReactorError>;

/// Stable classification of a [`ReactorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    DateFormat,
    Syntax,
    Linkage,
    UnknownStatement,
    Cardinality,
    GroupingCycle,
    UnresolvedReference,
    RefineTarget,
    AugmentTarget,
    Deviation,
    TypeCycle,
    Restriction,
    UnresolvableDependency,
    EffectiveModel,
    Io,
    Config,
}

/// Reactor errors. Every variant is fatal to the build it occurs in.
#[derive(Error, Debug)]
pub enum ReactorError {
    #[error("Malformed source identity: {0}")]
    Format(String),

    #[error("Invalid revision '{revision}': expected YYYY-MM-DD")]
    DateFormat { revision: String },

    #[error("Syntax error at {location}: {message}")]
    Syntax {
        location: StatementLocation,
        message: String,
    },

    #[error("Linkage failed for {source_id}: {message}")]
    Linkage {
        source_id: SourceIdentifier,
        message: String,
    },

    #[error("Unknown statement '{keyword}' in {source_id} at {location}")]
    UnknownStatement {
        source_id: SourceIdentifier,
        keyword: String,
        location: StatementLocation,
    },

    #[error("Invalid '{keyword}' in {source_id} at {location}: {message}")]
    Cardinality {
        source_id: SourceIdentifier,
        keyword: String,
        location: StatementLocation,
        message: String,
    },

    #[error("Grouping cycle in {source_id} at {location}: {}", .cycle.join(" -> "))]
    GroupingCycle {
        source_id: SourceIdentifier,
        location: StatementLocation,
        cycle: Vec<String>,
    },

    #[error("Unresolved {reference} '{name}' in {source_id} at {location}")]
    UnresolvedReference {
        source_id: SourceIdentifier,
        location: StatementLocation,
        reference: &'static str,
        name: String,
    },

    #[error("Refine target '{target}' not found in {source_id} at {location}")]
    RefineTarget {
        source_id: SourceIdentifier,
        location: StatementLocation,
        target: String,
    },

    #[error("Augment target '{target}' in {source_id} at {location}: {message}")]
    AugmentTarget {
        source_id: SourceIdentifier,
        location: StatementLocation,
        target: String,
        message: String,
    },

    #[error("Deviation of '{target}' in {source_id} at {location}: {message}")]
    Deviation {
        source_id: SourceIdentifier,
        location: StatementLocation,
        target: String,
        message: String,
    },

    #[error("Typedef cycle in {source_id} at {location}: {}", .cycle.join(" -> "))]
    TypeCycle {
        source_id: SourceIdentifier,
        location: StatementLocation,
        cycle: Vec<String>,
    },

    #[error("Invalid restriction of type '{type_name}' in {source_id} at {location}: {message}")]
    Restriction {
        source_id: SourceIdentifier,
        location: StatementLocation,
        type_name: String,
        message: String,
    },

    #[error("No progress resolving dependencies of {}", .blocked.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", "))]
    UnresolvableDependency { blocked: Vec<SourceIdentifier> },

    #[error("Effective model failed: {message} ({})", .modules.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", "))]
    EffectiveModel {
        modules: Vec<SourceIdentifier>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl ReactorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::Format,
            Self::DateFormat { .. } => ErrorKind::DateFormat,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Linkage { .. } => ErrorKind::Linkage,
            Self::UnknownStatement { .. } => ErrorKind::UnknownStatement,
            Self::Cardinality { .. } => ErrorKind::Cardinality,
            Self::GroupingCycle { .. } => ErrorKind::GroupingCycle,
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::RefineTarget { .. } => ErrorKind::RefineTarget,
            Self::AugmentTarget { .. } => ErrorKind::AugmentTarget,
            Self::Deviation { .. } => ErrorKind::Deviation,
            Self::TypeCycle { .. } => ErrorKind::TypeCycle,
            Self::Restriction { .. } => ErrorKind::Restriction,
            Self::UnresolvableDependency { .. } => ErrorKind::UnresolvableDependency,
            Self::EffectiveModel { .. } => ErrorKind::EffectiveModel,
            Self::Io(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn linkage(source_id: &SourceIdentifier, message: impl Into<String>) -> Self {
        Self::Linkage {
            source_id: source_id.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn cardinality(
        source_id: &SourceIdentifier,
        keyword: impl fmt::Display,
        location: &StatementLocation,
        message: impl Into<String>,
    ) -> Self {
        Self::Cardinality {
            source_id: source_id.clone(),
            keyword: keyword.to_string(),
            location: location.clone(),
            message: message.into(),
        }
    }
}
