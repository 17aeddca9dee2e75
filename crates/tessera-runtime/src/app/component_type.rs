//! Component type descriptors.

use std::fmt;
use std::sync::Arc;
use tessera_component::{Component, ComponentContext, ComponentError, Constructed};
use tessera_types::{Category, Relation, TypeKey};

/// Builds one instance from its construction context. Must not block.
pub type Constructor =
    Arc<dyn Fn(ComponentContext) -> Result<Constructed, ComponentError> + Send + Sync>;

/// Supplies the current relation list of a type. `None` marks a
/// relation-less singleton type.
pub type RelationsProvider = Arc<dyn Fn() -> Option<Vec<Relation>> + Send + Sync>;

/// Identity questions the reconciler asks about a type.
///
/// Implemented by local [`ComponentType`]s and by bridged types, which
/// answer for a component whose implementation lives in another
/// execution context.
pub trait Describe {
    /// Type identity.
    fn key(&self) -> TypeKey;

    /// Display name, also the default exposure module source.
    fn name(&self) -> &str;

    /// Category deciding construction and initialization order.
    fn category(&self) -> Category;

    /// Current relation list, or `None` for a singleton type.
    fn relations(&self) -> Option<Vec<Relation>>;
}

/// Everything the reconciler needs to manage instances of one type.
///
/// # Example
///
/// ```
/// use tessera_component::{testing::Probe, Constructed};
/// use tessera_runtime::app::{ComponentType, Describe};
/// use tessera_types::{Category, Relation};
///
/// let guilds = vec![Relation::new(1_u64), Relation::new(2_u64)];
/// let ty = ComponentType::of::<Probe>(Category::Services, |cx| {
///     Ok(Constructed::ready(Probe::new("Probe", &cx)))
/// })
/// .with_relations(move || Some(guilds.clone()));
///
/// assert_eq!(ty.name(), "Probe");
/// assert_eq!(ty.relations().map(|r| r.len()), Some(2));
/// ```
#[derive(Clone)]
pub struct ComponentType {
    key: TypeKey,
    name: String,
    category: Category,
    ancestors: Vec<TypeKey>,
    constructor: Constructor,
    relations: Option<RelationsProvider>,
}

impl ComponentType {
    /// Describes a type identified by `key`.
    pub fn new<F>(key: TypeKey, category: Category, constructor: F) -> Self
    where
        F: Fn(ComponentContext) -> Result<Constructed, ComponentError> + Send + Sync + 'static,
    {
        Self {
            key,
            name: key.name().to_string(),
            category,
            ancestors: Vec::new(),
            constructor: Arc::new(constructor),
            relations: None,
        }
    }

    /// Describes the Rust component type `T`.
    pub fn of<T: Component>(
        category: Category,
        constructor: impl Fn(ComponentContext) -> Result<Constructed, ComponentError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self::new(TypeKey::of::<T>(), category, constructor)
    }

    /// Overrides the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declares a supertype. Post-construct handlers registered for it run
    /// for this type too, after this type's own handlers.
    ///
    /// Call in order from nearest to farthest ancestor.
    #[must_use]
    pub fn extends(mut self, ancestor: TypeKey) -> Self {
        if ancestor != self.key && !self.ancestors.contains(&ancestor) {
            self.ancestors.push(ancestor);
        }
        self
    }

    /// Makes the type relation-scoped.
    #[must_use]
    pub fn with_relations(
        mut self,
        provider: impl Fn() -> Option<Vec<Relation>> + Send + Sync + 'static,
    ) -> Self {
        self.relations = Some(Arc::new(provider));
        self
    }

    /// Uses an already shared relations provider.
    #[must_use]
    pub fn with_relations_provider(mut self, provider: RelationsProvider) -> Self {
        self.relations = Some(provider);
        self
    }

    /// Declared supertypes, nearest first.
    #[must_use]
    pub fn ancestors(&self) -> &[TypeKey] {
        &self.ancestors
    }

    /// The type itself followed by its ancestors.
    pub fn lineage(&self) -> impl Iterator<Item = TypeKey> + '_ {
        std::iter::once(self.key).chain(self.ancestors.iter().copied())
    }

    /// Returns whether this type is `key` or declares it as an ancestor.
    #[must_use]
    pub fn is_a(&self, key: TypeKey) -> bool {
        self.lineage().any(|k| k == key)
    }

    pub(crate) fn construct(&self, cx: ComponentContext) -> Result<Constructed, ComponentError> {
        (self.constructor)(cx)
    }
}

impl Describe for ComponentType {
    fn key(&self) -> TypeKey {
        self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category.clone()
    }

    fn relations(&self) -> Option<Vec<Relation>> {
        self.relations.as_ref().and_then(|provider| provider())
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("ancestors", &self.ancestors)
            .field("relation_scoped", &self.relations.is_some())
            .finish()
    }
}
