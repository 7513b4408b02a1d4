//! YANG Reactor
//!
//! Cross-source statement inference for YANG: takes a set of parsed
//! module/submodule sources, links them and produces one immutable,
//! fully resolved [`SchemaContext`].
//!
//! ## Features
//!
//! - **Source Identity**: `name@YYYY-MM-DD` identifiers with canonical file names
//! - **Phased Build**: every source passes each phase before the next one starts
//! - **Linkage**: imports, includes and belongs-to resolved into a module graph
//! - **Effective Model**: uses/refine, augment, deviation and typedef chains applied
//! - **Thread-Safe Result**: the schema context is read-only and `Send + Sync`
//!
//! ## Architecture
//!
//! ```text
//! YangSource ──► PRE_LINKAGE ──► LINKAGE ──► STATEMENT_DEFINITION
//!                  (headers)    (ModuleGraph)    (bound keywords)
//!
//!            ──► FULL_DECLARATION ──► EFFECTIVE_MODEL ──► SchemaContext
//!                 (DeclaredModel)     instantiate
//!                                     augment
//!                                     deviate
//! ```

pub mod config;
pub mod context;
pub mod effective;
pub mod error;
pub mod identifier;
pub mod parser;
pub mod reactor;
pub mod repository;
pub mod source;
pub mod stmt;

pub use config::ReactorConfig;
pub use context::{Condition, ConditionKind, Module, NodeId, QName, SchemaContext, SchemaNode};
pub use effective::{BuiltinType, EffectiveType, Interval};
pub use error::{ErrorKind, ReactorError, Result};
pub use identifier::{Revision, SourceIdentifier};
pub use reactor::{BuildSession, DeclaredModel, ModuleGraph, Phase};
pub use repository::{DirectoryRepository, InMemoryRepository, SourceRepository};
pub use source::YangSource;
pub use stmt::{StatementKind, StatementNode, YangVersion};
