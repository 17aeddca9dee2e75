//! Opaque identity objects that scope component instances.
//!
//! A [`Relation`] is compared by *identity*, never by content: two
//! relations wrapping equal values are still different relations unless
//! they share the same allocation. This is what lets an external
//! collaborator keep one instance alive across reconciliation passes by
//! handing back the same relation object, and replace it by handing
//! back a new one.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Opaque identity handle.
///
/// Cloning is cheap and preserves identity.
///
/// # Example
///
/// ```
/// use tessera_types::Relation;
///
/// let a = Relation::new("chat-42".to_string());
/// let b = Relation::new("chat-42".to_string());
///
/// assert_eq!(a, a.clone());
/// assert_ne!(a, b); // equal contents, different identity
/// assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("chat-42"));
/// ```
#[derive(Clone)]
pub struct Relation {
    value: Arc<dyn Any + Send + Sync>,
}

impl Relation {
    /// Wraps a value in a fresh identity.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    /// Uses an existing allocation as the identity.
    ///
    /// Calling this twice with clones of the same `Arc` yields equal
    /// relations.
    #[must_use]
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self { value }
    }

    /// Borrows the wrapped value if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns the identity address. Stable while any clone is alive.
    #[must_use]
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.value) as *const () as usize
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Relation) -> bool {
        self.addr() == other.addr()
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Relation {}

impl Hash for Relation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relation({:#x})", self.addr())
    }
}

/// Identity comparison of two optional relations.
///
/// `None` only equals `None`.
#[must_use]
pub fn same_relation(a: Option<&Relation>, b: Option<&Relation>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.ptr_eq(b),
        (None, None) => true,
        _ => false,
    }
}
