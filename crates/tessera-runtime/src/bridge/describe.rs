//! Type descriptor for hosted components.

use super::{BridgedComponent, RemoteContext};
use crate::app::{ComponentType, Describe, RelationsProvider};
use crate::config::BridgeConfig;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tessera_component::{Component, ComponentContext, ComponentError, Constructed};
use tessera_types::{Category, Relation, TypeKey};
use tracing::debug;

/// Builds the remote instance on the host thread.
pub type RemoteFactory =
    Arc<dyn Fn(ComponentContext) -> Result<Constructed, ComponentError> + Send + Sync>;

/// Encodes a local relation for the remote constructor.
pub type RelationEncoder = Arc<dyn Fn(&Relation) -> Value + Send + Sync>;

/// Declares a component type whose instances run in their own host.
///
/// Each instance gets a fresh host thread. Converting into a
/// [`ComponentType`] yields a constructor that returns a pending
/// instance; the reconciler awaits the remote constructor before running
/// post-construct handlers.
///
/// # Example
///
/// ```
/// use tessera_component::{testing::Probe, Constructed};
/// use tessera_runtime::app::Describe;
/// use tessera_runtime::bridge::BridgedType;
/// use tessera_types::Category;
///
/// let ty = BridgedType::new("Lyrics", Category::Services, |cx| {
///     Ok(Constructed::ready(Probe::new("LyricsWorker", &cx)))
/// });
/// assert_eq!(ty.name(), "Lyrics");
/// assert_eq!(ty.relations(), None);
/// ```
#[derive(Clone)]
pub struct BridgedType {
    name: &'static str,
    category: Category,
    ancestors: Vec<TypeKey>,
    relations: Option<RelationsProvider>,
    factory: RemoteFactory,
    config: BridgeConfig,
    encode: RelationEncoder,
}

impl BridgedType {
    /// Declares a hosted type. `name` is the local type name and key;
    /// instances take the name the remote constructor reports.
    pub fn new<F>(name: &'static str, category: Category, factory: F) -> Self
    where
        F: Fn(ComponentContext) -> Result<Constructed, ComponentError> + Send + Sync + 'static,
    {
        Self {
            name,
            category,
            ancestors: Vec::new(),
            relations: None,
            factory: Arc::new(factory),
            config: BridgeConfig::default(),
            encode: Arc::new(encode_relation),
        }
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

    /// Declares a supertype.
    #[must_use]
    pub fn extends(mut self, ancestor: TypeKey) -> Self {
        self.ancestors.push(ancestor);
        self
    }

    /// Sets the host configuration.
    #[must_use]
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the relation encoder.
    #[must_use]
    pub fn with_encoder(mut self, encode: impl Fn(&Relation) -> Value + Send + Sync + 'static) -> Self {
        self.encode = Arc::new(encode);
        self
    }
}

/// Default relation encoding: JSON values, strings and integers cross
/// as themselves, anything else as its identity address.
#[must_use]
pub fn encode_relation(relation: &Relation) -> Value {
    if let Some(value) = relation.downcast_ref::<Value>() {
        return value.clone();
    }
    if let Some(s) = relation.downcast_ref::<String>() {
        return Value::from(s.clone());
    }
    if let Some(s) = relation.downcast_ref::<&'static str>() {
        return Value::from(*s);
    }
    if let Some(n) = relation.downcast_ref::<u64>() {
        return Value::from(*n);
    }
    if let Some(n) = relation.downcast_ref::<i64>() {
        return Value::from(*n);
    }
    Value::from(relation.addr())
}

impl Describe for BridgedType {
    fn key(&self) -> TypeKey {
        TypeKey::named(self.name)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category.clone()
    }

    fn relations(&self) -> Option<Vec<Relation>> {
        self.relations.as_ref().and_then(|provider| provider())
    }
}

impl From<BridgedType> for ComponentType {
    fn from(ty: BridgedType) -> Self {
        let BridgedType {
            name,
            category,
            ancestors,
            relations,
            factory,
            config,
            encode,
        } = ty;

        let constructor = move |cx: ComponentContext| {
            let factory = Arc::clone(&factory);
            let remote = RemoteContext::spawn(&config, move |remote_cx| factory(remote_cx))
                .map_err(ComponentError::from)?;
            let encoded = cx.relation.as_ref().map(|r| encode(r));
            let wrapper = Arc::new(BridgedComponent::new(name, &cx, remote, encoded));
            debug!("Bridged instance spawned: {}", name);

            Ok(Constructed::pending(async move {
                match wrapper.construct().await {
                    Ok(()) => Ok(wrapper as Arc<dyn Component>),
                    Err(e) => Err(ComponentError::from(e)),
                }
            }))
        };

        let mut component_type =
            ComponentType::new(TypeKey::named(name), category, constructor).with_name(name);
        for ancestor in ancestors {
            component_type = component_type.extends(ancestor);
        }
        match relations {
            Some(provider) => component_type.with_relations_provider(provider),
            None => component_type,
        }
    }
}

impl fmt::Debug for BridgedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgedType")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("config", &self.config)
            .finish()
    }
}
