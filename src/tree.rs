use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, XrefError};
use crate::types::*;

/// The documentation model: an arena of entities rooted at a project.
///
/// Entities own their children through ordered id lists and point back at
/// their parent with a non-owning id. The root always lives at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocTree {
    entities: Vec<Entity>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl DocTree {
    /// Creates a tree holding only a project root.
    pub fn new(project_name: &str) -> Self {
        Self {
            entities: vec![Entity::new(EntityKind::Project, project_name)],
        }
    }

    /// Appends `entity` as the last child of `parent`.
    ///
    /// Fails if `parent` does not exist or cannot own an entity of that kind.
    pub fn add_child(&mut self, parent: EntityId, mut entity: Entity) -> Result<EntityId> {
        let parent_kind = self.kind_of(parent)?;
        if !parent_kind.can_contain(entity.kind) {
            return Err(XrefError::MalformedTree {
                message: format!(
                    "a {} cannot contain a {} ('{}')",
                    parent_kind.as_str(),
                    entity.kind.as_str(),
                    entity.name
                ),
            });
        }

        let id = EntityId(self.entities.len());
        entity.parent = Some(parent);
        entity.children.clear();
        self.entities.push(entity);
        self.entities[parent.index()].children.push(id);
        Ok(id)
    }

    pub fn add_file(&mut self, path: &str) -> Result<EntityId> {
        self.add_child(self.root(), Entity::new(EntityKind::File, path))
    }

    /// Adds a class to `file`. `full_name` is the name `@uses` references match.
    pub fn add_class(&mut self, file: EntityId, name: &str, full_name: &str) -> Result<EntityId> {
        let mut class = Entity::new(EntityKind::Class, name);
        class.full_name = Some(full_name.to_string());
        self.add_child(file, class)
    }

    pub fn add_function(&mut self, file: EntityId, name: &str) -> Result<EntityId> {
        self.add_child(file, Entity::new(EntityKind::Function, name))
    }

    pub fn add_method(&mut self, class: EntityId, name: &str) -> Result<EntityId> {
        self.add_child(class, Entity::new(EntityKind::Method, name))
    }

    /// Adds a property; a leading `$` on `name` is dropped.
    pub fn add_property(&mut self, class: EntityId, name: &str) -> Result<EntityId> {
        let bare = name.strip_prefix('$').unwrap_or(name);
        self.add_child(class, Entity::new(EntityKind::Property, bare))
    }

    pub fn add_constant(&mut self, class: EntityId, name: &str) -> Result<EntityId> {
        self.add_child(class, Entity::new(EntityKind::Constant, name))
    }

    /// Appends `tag` to the docblock of `id`, creating the docblock if needed.
    pub fn add_tag(&mut self, id: EntityId, tag: Tag) -> Result<()> {
        let docblock = self
            .docblock_mut(id)
            .ok_or_else(|| XrefError::MalformedTree {
                message: format!("no entity with id {}", id.index()),
            })?;
        docblock.tags.push(tag);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

impl DocTree {
    pub fn root(&self) -> EntityId {
        EntityId(0)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.get(id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.get(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Returns the docblock of `id`, attaching an empty one if it has none.
    pub fn docblock_mut(&mut self, id: EntityId) -> Option<&mut Docblock> {
        self.entities
            .get_mut(id.index())
            .map(|e| e.docblock.get_or_insert_with(Docblock::default))
    }

    /// All entity ids in document order (pre-order, children in order).
    pub fn walk(&self) -> Vec<EntityId> {
        let mut order = Vec::with_capacity(self.entities.len());
        if self.entities.is_empty() {
            return order;
        }

        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Finds the direct child of `parent` with the given kind and bare name.
    pub fn child_named(&self, parent: EntityId, kind: EntityKind, name: &str) -> Vec<EntityId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| {
                self.get(*c)
                    .is_some_and(|e| e.kind == kind && e.name == name)
            })
            .collect()
    }

    fn kind_of(&self, id: EntityId) -> Result<EntityKind> {
        self.get(id)
            .map(|e| e.kind)
            .ok_or_else(|| XrefError::MalformedTree {
                message: format!("no entity with id {}", id.index()),
            })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl DocTree {
    /// Checks the structural invariants the resolver relies on.
    ///
    /// The root must be a project without a parent, every other entity must
    /// be listed exactly once by a parent allowed to contain it, and every
    /// class needs a non-empty full name.
    pub fn validate(&self) -> Result<()> {
        let root = self.get(self.root()).ok_or_else(|| malformed("tree has no root"))?;
        if root.kind != EntityKind::Project || root.parent.is_some() {
            return Err(malformed("root entity must be a project without a parent"));
        }

        for (index, entity) in self.entities.iter().enumerate() {
            let id = EntityId(index);

            if index > 0 {
                let parent_id = entity.parent.ok_or_else(|| {
                    malformed(&format!("{} '{}' has no parent", entity.kind.as_str(), entity.name))
                })?;
                let parent = self.get(parent_id).ok_or_else(|| {
                    malformed(&format!(
                        "{} '{}' points at missing parent {}",
                        entity.kind.as_str(),
                        entity.name,
                        parent_id.index()
                    ))
                })?;
                if !parent.kind.can_contain(entity.kind) {
                    return Err(malformed(&format!(
                        "a {} cannot contain a {} ('{}')",
                        parent.kind.as_str(),
                        entity.kind.as_str(),
                        entity.name
                    )));
                }
                let listed = parent.children.iter().filter(|c| **c == id).count();
                if listed != 1 {
                    return Err(malformed(&format!(
                        "{} '{}' is listed {} times by its parent",
                        entity.kind.as_str(),
                        entity.name,
                        listed
                    )));
                }
            }

            for child in &entity.children {
                let owner = self.get(*child).and_then(|c| c.parent);
                if owner != Some(id) {
                    return Err(malformed(&format!(
                        "{} '{}' lists child {} which does not point back at it",
                        entity.kind.as_str(),
                        entity.name,
                        child.index()
                    )));
                }
            }

            if entity.kind == EntityKind::Class
                && entity.full_name.as_deref().map_or(true, str::is_empty)
            {
                return Err(malformed(&format!("class '{}' has no full name", entity.name)));
            }
        }

        Ok(())
    }
}

fn malformed(message: &str) -> XrefError {
    XrefError::MalformedTree {
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

impl DocTree {
    /// Reads a tree from a JSON file and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| XrefError::File {
            message: format!("failed to read documentation tree: {}", e),
            path: path.display().to_string(),
        })?;

        let tree: DocTree = serde_json::from_str(&contents).map_err(|e| XrefError::Parse {
            message: e.to_string(),
            path: path.display().to_string(),
            line: u32::try_from(e.line()).ok(),
        })?;

        tree.validate()?;
        Ok(tree)
    }

    /// Writes the tree as JSON, going through a temporary file so a partial
    /// write never replaces an existing tree.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(self)?;

        fs::write(&tmp_path, &json).map_err(|e| XrefError::File {
            message: format!("failed to write temporary tree file: {}", e),
            path: tmp_path.display().to_string(),
        })?;

        fs::rename(&tmp_path, path).map_err(|e| XrefError::File {
            message: format!(
                "failed to rename temporary tree file '{}': {}",
                tmp_path.display(),
                e
            ),
            path: path.display().to_string(),
        })?;

        Ok(())
    }
}
