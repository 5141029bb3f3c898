use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticSink, Severity};
use crate::errors::{ReferenceError, Result};
use crate::reference::SymbolRef;
use crate::resolution::{ClassIndex, TreeTransform};
use crate::tree::DocTree;
use crate::types::*;

/// Settings for a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Name of the tags to resolve.
    pub uses_tag: String,
    /// Name given to the synthesized reciprocal tags.
    pub used_by_tag: String,
    /// Also send zero-match references to the sink, at notice severity.
    pub report_unresolved: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            uses_tag: USES_TAG.to_string(),
            used_by_tag: USED_BY_TAG.to_string(),
            report_unresolved: false,
        }
    }
}

/// A `@uses` tag captured before the tree is mutated.
struct PendingUse {
    origin: EntityId,
    /// Reciprocal reference, or the owner's bare name when it cannot be
    /// referred to (file and project docblocks).
    origin_ref: String,
    nameable: bool,
    refers: String,
}

/// Links every `@uses` tag in a tree to the entity it names.
///
/// For each tag, in document order, the reference is parsed, looked up
/// through a [`ClassIndex`] and, when exactly one entity matches, a
/// `@used_by` tag naming the tag's owner is appended to that entity's
/// docblock. Ambiguous lookups and tags whose owner has no reference of
/// its own are logged as errors, lookups that cannot run as critical;
/// none of them stops the pass.
#[derive(Debug, Clone, Default)]
pub struct UsesResolver {
    options: ResolverOptions,
}

impl UsesResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// Runs one pass over `tree`, returning what happened to each `@uses` tag.
    ///
    /// The set of tags is captured up front, so tags added during the pass
    /// are never processed. Running the pass twice appends a second copy of
    /// every `@used_by` tag.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::XrefError::MalformedTree`] when the tree
    /// breaks its structural invariants. This is checked before anything is
    /// written.
    pub fn resolve(
        &self,
        tree: &mut DocTree,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ResolutionReport> {
        tree.validate()?;
        let pending = self.collect_uses(tree);
        let index = ClassIndex::build(tree);

        let mut report = ResolutionReport {
            total: pending.len(),
            ..ResolutionReport::default()
        };

        for item in pending {
            if !item.nameable {
                let reason = format!("'{}' has no symbol to refer back to", item.origin_ref);
                sink.log(
                    &format!("@uses \"{}\" is skipped: {}", item.refers, reason),
                    Severity::Error,
                );
                report.failed.push(skipped(&item, 0, Some(reason)));
                continue;
            }

            // Malformed references cannot match anything and are treated as
            // misses; only references that cannot be looked up at all fail.
            let symbol = match SymbolRef::parse(&item.refers) {
                Ok(symbol) => symbol,
                Err(e @ ReferenceError::ControlCharacter(_)) => {
                    sink.log(
                        &format!(
                            "@uses \"{}\" on {} could not be looked up: {}",
                            item.refers.escape_default(),
                            item.origin_ref,
                            e
                        ),
                        Severity::Critical,
                    );
                    report.failed.push(skipped(&item, 0, Some(e.to_string())));
                    continue;
                }
                Err(e) => {
                    self.record_unresolved(&item, Some(e.to_string()), sink, &mut report);
                    continue;
                }
            };

            let matches = index.lookup(tree, &symbol);
            match matches.as_slice() {
                [] => self.record_unresolved(&item, None, sink, &mut report),
                [target] => {
                    let target = *target;
                    tree.add_tag(
                        target,
                        Tag::reciprocal(&self.options.used_by_tag, &item.origin_ref),
                    )?;
                    tracing::debug!(
                        refers = %item.refers,
                        origin = %item.origin_ref,
                        target = target.index(),
                        "linked @uses reference"
                    );
                    report.links.push(UsedByLink {
                        origin: item.origin,
                        origin_ref: item.origin_ref,
                        refers: item.refers,
                        target,
                    });
                }
                candidates => {
                    sink.log(
                        &format!("@uses \"{}\" refers to more than 1 element", item.refers),
                        Severity::Error,
                    );
                    report
                        .ambiguous
                        .push(skipped(&item, candidates.len(), None));
                }
            }
        }

        tracing::info!(
            total = report.total,
            resolved = report.resolved_count(),
            skipped = report.skipped_count(),
            "@uses resolution complete"
        );
        Ok(report)
    }

    fn record_unresolved(
        &self,
        item: &PendingUse,
        reason: Option<String>,
        sink: &mut dyn DiagnosticSink,
        report: &mut ResolutionReport,
    ) {
        tracing::debug!(
            refers = %item.refers,
            origin = %item.origin_ref,
            reason = reason.as_deref().unwrap_or(""),
            "@uses reference did not match any element"
        );
        if self.options.report_unresolved {
            sink.log(
                &format!(
                    "@uses \"{}\" on {} does not match any element",
                    item.refers, item.origin_ref
                ),
                Severity::Notice,
            );
        }
        report.unresolved.push(skipped(item, 0, reason));
    }

    /// Captures every `@uses` tag in document order along with the
    /// reciprocal reference for its owner.
    fn collect_uses(&self, tree: &DocTree) -> Vec<PendingUse> {
        let mut pending = Vec::new();

        for id in tree.walk() {
            let Some(entity) = tree.get(id) else {
                continue;
            };
            let Some(docblock) = &entity.docblock else {
                continue;
            };

            let mut tags = docblock.tags_named(&self.options.uses_tag).peekable();
            if tags.peek().is_none() {
                continue;
            }

            let reciprocal = reciprocal_reference(tree, id);
            let nameable = reciprocal.is_some();
            let origin_ref = reciprocal.unwrap_or_else(|| entity.name.clone());
            for tag in tags {
                pending.push(PendingUse {
                    origin: id,
                    origin_ref: origin_ref.clone(),
                    nameable,
                    refers: tag.refers.clone(),
                });
            }
        }

        pending
    }
}

impl TreeTransform for UsesResolver {
    fn name(&self) -> &str {
        "uses"
    }

    fn transform(
        &self,
        tree: &mut DocTree,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ResolutionReport> {
        self.resolve(tree, sink)
    }
}

/// Builds the reference that names `origin` in a `@used_by` tag.
///
/// A class is named by its full name. Members and functions use their bare
/// name, with `()` appended for methods and functions, and are qualified
/// with `Class::` when they sit inside a class. Properties do not get their
/// `$` back.
///
/// Returns `None` for projects and files, which no reference can name, and
/// for ids outside the tree.
pub fn reciprocal_reference(tree: &DocTree, origin: EntityId) -> Option<String> {
    let entity = tree.get(origin)?;

    match entity.kind {
        EntityKind::Class => Some(qualified_class_name(entity).to_string()),
        EntityKind::Method | EntityKind::Function | EntityKind::Property | EntityKind::Constant => {
            let mut name = entity.name.clone();
            if entity.kind.is_callable() {
                name.push_str("()");
            }

            let class = entity
                .parent
                .and_then(|p| tree.get(p))
                .filter(|p| p.kind == EntityKind::Class);
            if let Some(class) = class {
                name = format!("{}::{}", qualified_class_name(class), name);
            }
            Some(name)
        }
        EntityKind::Project | EntityKind::File => None,
    }
}

fn qualified_class_name(class: &Entity) -> &str {
    class.full_name.as_deref().unwrap_or(&class.name)
}

fn skipped(item: &PendingUse, candidates: usize, reason: Option<String>) -> SkippedUse {
    SkippedUse {
        origin_ref: item.origin_ref.clone(),
        refers: item.refers.clone(),
        candidates,
        reason,
    }
}
