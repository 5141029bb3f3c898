//! Symbol references as written in `@uses` tags.
//!
//! A reference is either a bare class name (`Foo`) or a class member
//! (`Foo::$bar`, `Foo::bar()`, `Foo::BAR`). The member's kind is decided
//! purely from its shape: a trailing `()` means method, otherwise a leading
//! `$` means property, otherwise it is a constant.

use std::fmt;

use crate::errors::ReferenceError;
use crate::types::EntityKind;

/// Kinds of class members a reference can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    Method,
    Constant,
}

impl MemberKind {
    /// Classifies a member fragment. The `()` suffix wins over a `$` prefix.
    pub fn classify(fragment: &str) -> Self {
        if fragment.ends_with("()") {
            MemberKind::Method
        } else if fragment.starts_with('$') {
            MemberKind::Property
        } else {
            MemberKind::Constant
        }
    }

    /// Removes the marker that identified this kind, leaving the bare name.
    pub fn strip_marker(self, fragment: &str) -> &str {
        match self {
            MemberKind::Property => fragment.strip_prefix('$').unwrap_or(fragment),
            MemberKind::Method => fragment.strip_suffix("()").unwrap_or(fragment),
            MemberKind::Constant => fragment,
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        match self {
            MemberKind::Property => EntityKind::Property,
            MemberKind::Method => EntityKind::Method,
            MemberKind::Constant => EntityKind::Constant,
        }
    }
}

/// A parsed `@uses` target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Class {
        class: String,
    },
    Member {
        class: String,
        kind: MemberKind,
        /// Bare member name with its marker removed.
        name: String,
    },
}

impl SymbolRef {
    /// Parses a reference, splitting on the first `::`.
    pub fn parse(refers: &str) -> Result<Self, ReferenceError> {
        if refers.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if refers.chars().any(char::is_control) {
            return Err(ReferenceError::ControlCharacter(refers.escape_default().to_string()));
        }

        let Some((class, member)) = refers.split_once("::") else {
            return Ok(SymbolRef::Class {
                class: refers.to_string(),
            });
        };

        if class.is_empty() {
            return Err(ReferenceError::MissingClass(refers.to_string()));
        }

        let kind = MemberKind::classify(member);
        let name = kind.strip_marker(member);
        if name.is_empty() {
            return Err(ReferenceError::MissingMember(refers.to_string()));
        }

        Ok(SymbolRef::Member {
            class: class.to_string(),
            kind,
            name: name.to_string(),
        })
    }

    /// Full name of the class the reference starts from.
    pub fn class_name(&self) -> &str {
        match self {
            SymbolRef::Class { class } | SymbolRef::Member { class, .. } => class,
        }
    }

    /// The kind of entity the reference resolves to.
    pub fn target_kind(&self) -> EntityKind {
        match self {
            SymbolRef::Class { .. } => EntityKind::Class,
            SymbolRef::Member { kind, .. } => kind.entity_kind(),
        }
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolRef::Class { class } => write!(f, "{}", class),
            SymbolRef::Member {
                class,
                kind: MemberKind::Property,
                name,
            } => write!(f, "{}::${}", class, name),
            SymbolRef::Member {
                class,
                kind: MemberKind::Method,
                name,
            } => write!(f, "{}::{}()", class, name),
            SymbolRef::Member {
                class,
                kind: MemberKind::Constant,
                name,
            } => write!(f, "{}::{}", class, name),
        }
    }
}
