use serde::{Deserialize, Serialize};

/// Name of the tag that declares a dependency on another symbol.
pub const USES_TAG: &str = "uses";

/// Name of the tag recorded on the symbol a `@uses` tag points at.
pub const USED_BY_TAG: &str = "used_by";

/// Kinds of entities in the documentation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    File,
    Class,
    Function,
    Method,
    Property,
    Constant,
}

#[allow(clippy::should_implement_trait)]
impl EntityKind {
    /// Returns the string representation of this entity kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::File => "file",
            EntityKind::Class => "class",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::Property => "property",
            EntityKind::Constant => "constant",
        }
    }

    /// Parses a string into an `EntityKind`, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<EntityKind> {
        match s {
            "project" => Some(EntityKind::Project),
            "file" => Some(EntityKind::File),
            "class" => Some(EntityKind::Class),
            "function" => Some(EntityKind::Function),
            "method" => Some(EntityKind::Method),
            "property" => Some(EntityKind::Property),
            "constant" => Some(EntityKind::Constant),
            _ => None,
        }
    }

    /// Whether an entity of this kind may directly own an entity of `child` kind.
    ///
    /// Project → file; file → class | function; class → method | property | constant.
    pub fn can_contain(&self, child: EntityKind) -> bool {
        matches!(
            (self, child),
            (EntityKind::Project, EntityKind::File)
                | (EntityKind::File, EntityKind::Class)
                | (EntityKind::File, EntityKind::Function)
                | (EntityKind::Class, EntityKind::Method)
                | (EntityKind::Class, EntityKind::Property)
                | (EntityKind::Class, EntityKind::Constant)
        )
    }

    /// Methods and free functions; their references carry a `()` suffix.
    pub fn is_callable(&self) -> bool {
        matches!(self, EntityKind::Method | EntityKind::Function)
    }
}

/// Index of an entity inside a `DocTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single named annotation inside a docblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub refers: String,
    #[serde(default)]
    pub description: String,
    /// Source line; synthesized tags have none and serialize it as `""`.
    #[serde(default, with = "line_attr")]
    pub line: Option<u32>,
}

impl Tag {
    /// Creates a tag as the parser would, with a source line.
    pub fn new(name: &str, refers: &str, line: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            refers: refers.to_string(),
            description: String::new(),
            line,
        }
    }

    /// Creates a `@uses` tag pointing at `refers`.
    pub fn uses(refers: &str, line: Option<u32>) -> Self {
        Self::new(USES_TAG, refers, line)
    }

    /// Creates a synthesized `@used_by` tag whose description and target both
    /// name `reference`.
    pub fn used_by(reference: &str) -> Self {
        Self::reciprocal(USED_BY_TAG, reference)
    }

    /// Creates a synthesized tag named `name` whose description and target
    /// both name `reference`.
    pub fn reciprocal(name: &str, reference: &str) -> Self {
        Self {
            name: name.to_string(),
            refers: reference.to_string(),
            description: reference.to_string(),
            line: None,
        }
    }
}

/// Ordered collection of tags attached to one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docblock {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Docblock {
    /// Iterates the tags with the given name, in order.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.name == name)
    }
}

/// A node in the documentation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Bare name. Properties are stored without their `$` sigil; files use
    /// their path.
    pub name: String,
    /// Fully qualified name; required for classes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docblock: Option<Docblock>,
    #[serde(default)]
    pub parent: Option<EntityId>,
    #[serde(default)]
    pub children: Vec<EntityId>,
}

impl Entity {
    pub fn new(kind: EntityKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            full_name: None,
            line: None,
            docblock: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Tags of this entity's docblock, or an empty slice if it has none.
    pub fn tags(&self) -> &[Tag] {
        self.docblock.as_ref().map(|d| d.tags.as_slice()).unwrap_or(&[])
    }
}

/// Source lines are attributes in the documentation model: numeric when the
/// parser knows them and the empty string otherwise.
mod line_attr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(line: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        match line {
            Some(n) => s.serialize_str(&n.to_string()),
            None => s.serialize_str(""),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Number(n)) => Ok(Some(n)),
            Some(Raw::Text(t)) if t.trim().is_empty() => Ok(None),
            Some(Raw::Text(t)) => t
                .trim()
                .parse()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// A `@uses` tag that was linked to its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedByLink {
    /// Entity whose docblock holds the `@uses` tag.
    pub origin: EntityId,
    /// Reciprocal reference naming the origin, as written to the new tag.
    pub origin_ref: String,
    /// The `@uses` reference as written.
    pub refers: String,
    /// Entity that received the `@used_by` tag.
    pub target: EntityId,
}

/// A `@uses` tag that was skipped without touching the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUse {
    pub origin_ref: String,
    pub refers: String,
    /// Number of candidates found; zero for unresolved and failed lookups.
    pub candidates: usize,
    /// Why the lookup could not run, for failed lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of one resolution pass. Every `@uses` tag lands in exactly one of
/// `links`, `unresolved`, `ambiguous` or `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub total: usize,
    pub links: Vec<UsedByLink>,
    pub unresolved: Vec<SkippedUse>,
    pub ambiguous: Vec<SkippedUse>,
    pub failed: Vec<SkippedUse>,
}

impl ResolutionReport {
    pub fn resolved_count(&self) -> usize {
        self.links.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.unresolved.len() + self.ambiguous.len() + self.failed.len()
    }
}

/// Output format for CLI reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Markdown,
    Json,
}
