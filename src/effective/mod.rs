//! EFFECTIVE_MODEL phase
//!
//! Runs in four steps over per-module node arenas:
//!
//! 1. instantiate every module on its own (uses, refine, types)
//! 2. apply top-level augments in cross-module dependency order
//! 3. apply deviations
//! 4. freeze everything into a [`SchemaContext`]

mod augment;
mod deviation;
mod instantiate;
mod scope;
mod tree;
pub mod types;

use std::collections::BTreeMap;

use tracing::{debug, info_span};

use crate::context::SchemaContext;
use crate::error::Result;
use crate::reactor::{map_items, DeclaredModel};

pub(crate) use tree::{ModuleTree, NodeIdx};
pub use types::{BuiltinType, EffectiveType, Interval, PatternRestriction};

/// Build the schema context for a declared model
pub(crate) fn build(model: &DeclaredModel, parallel: bool) -> Result<SchemaContext> {
    let modules: Vec<_> = model.module_indices().collect();

    let mut trees = {
        let _step = info_span!("instantiate", modules = modules.len()).entered();
        map_items(parallel, &modules, |_, &module| {
            let tree = instantiate::Instantiator::build(model, module)?;
            debug!(module = %model.sources()[module].id(), nodes = tree.nodes.len(), "module instantiated");
            Ok(tree)
        })?
    };

    let positions: BTreeMap<_, _> = modules.iter().enumerate().map(|(pos, &m)| (m, pos)).collect();
    let resolver = augment::Resolver {
        model,
        positions: &positions,
    };

    {
        let _step = info_span!("augment").entered();
        augment::apply_all(&resolver, &mut trees)?;
    }
    {
        let _step = info_span!("deviation").entered();
        deviation::apply_all(&resolver, &mut trees)?;
    }

    Ok(SchemaContext::freeze(model, trees))
}
