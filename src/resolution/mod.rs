/// `@uses` resolution module.
///
/// Resolves the symbol named by every `@uses` tag against the documentation
/// tree and records a reciprocal `@used_by` tag on the entity it finds.
mod index;
mod resolver;

pub use index::ClassIndex;
pub use resolver::{reciprocal_reference, ResolverOptions, UsesResolver};

use crate::diagnostics::DiagnosticSink;
use crate::errors::Result;
use crate::tree::DocTree;
use crate::types::ResolutionReport;

/// A pass over the documentation tree, run by a surrounding pipeline.
///
/// Implementations mutate the tree in place and report per-item problems to
/// the sink; only a structurally broken tree is returned as an error.
pub trait TreeTransform {
    /// Human-readable name of the pass.
    fn name(&self) -> &str;

    fn transform(
        &self,
        tree: &mut DocTree,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ResolutionReport>;
}
