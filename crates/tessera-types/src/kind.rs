//! Component type identity and categories.

use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyId {
    Type(TypeId),
    Named(&'static str),
}

/// Runtime identity of a component type.
///
/// Keys built with [`TypeKey::of`] compare by [`TypeId`]; keys built with
/// [`TypeKey::named`] compare by name. The display name is informational
/// only and takes no part in equality.
///
/// # Example
///
/// ```
/// use tessera_types::TypeKey;
///
/// struct Player;
/// struct Queue;
///
/// assert_eq!(TypeKey::of::<Player>(), TypeKey::of::<Player>());
/// assert_ne!(TypeKey::of::<Player>(), TypeKey::of::<Queue>());
/// assert_eq!(TypeKey::of::<Player>().name(), "Player");
/// assert_eq!(TypeKey::named("lyrics").name(), "lyrics");
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: KeyId,
    name: &'static str,
}

impl TypeKey {
    /// Key for a concrete Rust type.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        let full = type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        Self {
            id: KeyId::Type(TypeId::of::<T>()),
            name,
        }
    }

    /// Key for a type that has no Rust counterpart on this side, such as
    /// a component hosted in another execution context.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self {
            id: KeyId::Named(name),
            name,
        }
    }

    /// Short, human-readable type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Component category.
///
/// The ordering is the startup precedence: relation-less service
/// singletons first, then views, then controllers, then anything custom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Long-lived shared services.
    Services,
    /// Presentation components.
    Views,
    /// Components that drive views and services.
    Controllers,
    /// Anything else, started last.
    Custom(String),
}

impl Category {
    /// Returns the category name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Services => "services",
            Self::Views => "views",
            Self::Controllers => "controllers",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
