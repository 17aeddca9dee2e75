//! Application assembly.

use super::{Application, ComponentType, Describe};
use crate::config::RuntimeConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tessera_component::{downcast_arc, Component, ComponentError};
use tessera_types::TypeKey;
use tracing::debug;

/// Post-construct handler: runs once per instance of its type (or a
/// subtype), after construction and before `initialize`.
pub type PostConstruct =
    Arc<dyn Fn(&Application, &Arc<dyn Component>) -> Result<(), ComponentError> + Send + Sync>;

/// Builder for [`Application`].
///
/// # Example
///
/// ```
/// use tessera_component::{testing::Probe, Constructed};
/// use tessera_runtime::app::{ApplicationBuilder, ComponentType, InitArgs};
/// use tessera_types::{Category, TypeKey};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let app = ApplicationBuilder::new()
///     .component(ComponentType::of::<Probe>(Category::Services, |cx| {
///         Ok(Constructed::ready(Probe::new("Probe", &cx)))
///     }))
///     .on_construct_typed::<Probe>(|_app, probe| {
///         assert_eq!(probe.initialize_count(), 0);
///         Ok(())
///     })
///     .build();
///
/// let report = app.initialize(InitArgs::new()).await;
/// assert!(report.is_clean());
/// assert_eq!(app.get::<Probe>(None).expect("probe").initialize_count(), 1);
/// # }
/// ```
#[derive(Default)]
pub struct ApplicationBuilder {
    types: Vec<ComponentType>,
    handlers: HashMap<TypeKey, Vec<PostConstruct>>,
    args: HashMap<TypeKey, Vec<Value>>,
    config: RuntimeConfig,
}

impl ApplicationBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a component type.
    #[must_use]
    pub fn component(mut self, ty: impl Into<ComponentType>) -> Self {
        self.types.push(ty.into());
        self
    }

    /// Registers a post-construct handler for `key` and its subtypes.
    #[must_use]
    pub fn on_construct<F>(mut self, key: TypeKey, handler: F) -> Self
    where
        F: Fn(&Application, &Arc<dyn Component>) -> Result<(), ComponentError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.entry(key).or_default().push(Arc::new(handler));
        self
    }

    /// Registers a post-construct handler receiving the concrete type.
    ///
    /// Instances of subtypes with a different concrete type are skipped.
    #[must_use]
    pub fn on_construct_typed<T: Component>(
        self,
        handler: impl Fn(&Application, Arc<T>) -> Result<(), ComponentError> + Send + Sync + 'static,
    ) -> Self {
        self.on_construct(TypeKey::of::<T>(), move |app, component| {
            match downcast_arc::<T>(Arc::clone(component)) {
                Some(typed) => handler(app, typed),
                None => Ok(()),
            }
        })
    }

    /// Stores initialization arguments for `key`.
    #[must_use]
    pub fn configure(mut self, key: TypeKey, args: Vec<Value>) -> Self {
        self.args.insert(key, args);
        self
    }

    /// Sets the runtime configuration.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Orders types by category, then constructs the initial instances.
    ///
    /// Construction failures are logged here and reported by the first
    /// [`Application::initialize`].
    #[must_use]
    pub fn build(mut self) -> Application {
        self.types.sort_by_key(Describe::category);

        let mut args: HashMap<TypeKey, Vec<Value>> = HashMap::new();
        for ty in &self.types {
            if let Some(configured) = self.config.init_args(ty.name()) {
                args.insert(ty.key(), configured.clone());
            }
        }
        args.extend(self.args);

        debug!(
            "Building application: types={}, handlers={}",
            self.types.len(),
            self.handlers.len()
        );
        Application::assemble(self.types, self.handlers, args, self.config)
    }
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("types", &self.types)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
