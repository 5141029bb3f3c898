use std::collections::HashMap;

use crate::reference::SymbolRef;
use crate::tree::DocTree;
use crate::types::*;

/// Classes grouped by their full name, in document order.
///
/// Built once per pass. Adding `@used_by` tags never adds or renames
/// classes, so the index stays valid for the whole pass.
pub struct ClassIndex {
    by_full_name: HashMap<String, Vec<EntityId>>,
}

impl ClassIndex {
    pub fn build(tree: &DocTree) -> Self {
        let mut by_full_name: HashMap<String, Vec<EntityId>> = HashMap::new();

        for id in tree.walk() {
            let Some(entity) = tree.get(id) else {
                continue;
            };
            if entity.kind != EntityKind::Class {
                continue;
            }
            if let Some(full_name) = &entity.full_name {
                by_full_name.entry(full_name.clone()).or_default().push(id);
            }
        }

        Self { by_full_name }
    }

    /// Classes whose full name is exactly `full_name`.
    pub fn classes(&self, full_name: &str) -> &[EntityId] {
        self.by_full_name
            .get(full_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct class names.
    pub fn len(&self) -> usize {
        self.by_full_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_full_name.is_empty()
    }

    /// Every entity `symbol` names.
    ///
    /// Member lookups search each class sharing the full name, so a member
    /// present in two same-named classes yields two matches.
    pub fn lookup(&self, tree: &DocTree, symbol: &SymbolRef) -> Vec<EntityId> {
        let classes = self.classes(symbol.class_name());

        match symbol {
            SymbolRef::Class { .. } => classes.to_vec(),
            SymbolRef::Member { kind, name, .. } => classes
                .iter()
                .flat_map(|class| tree.child_named(*class, kind.entity_kind(), name))
                .collect(),
        }
    }
}
