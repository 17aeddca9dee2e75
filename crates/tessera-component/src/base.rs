//! State shared by every component: identity, event hub and exposures.

use crate::{ComponentError, EventHub, Exposer, Handler, HandlerResult, Outbox};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tessera_event::{is_reserved, EventEnvelope, EventError};
use tessera_types::{ComponentUuid, Relation};
use tracing::debug;

/// Asks the owning application to run a reconciliation pass.
#[derive(Clone)]
pub struct RefreshHandle(Arc<dyn Fn() + Send + Sync>);

impl RefreshHandle {
    /// Wraps a trigger closure.
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A handle that does nothing. Used outside an application.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Requests a pass.
    pub fn request(&self) {
        (self.0)();
    }
}

impl Default for RefreshHandle {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshHandle")
    }
}

/// What a constructor receives.
#[derive(Debug, Clone, Default)]
pub struct ComponentContext {
    /// The application's exposure scope.
    pub exposer: Exposer,
    /// Relation of the instance being constructed.
    pub relation: Option<Relation>,
    /// Trigger for a reconciliation pass.
    pub refresh: RefreshHandle,
    outbox: Option<Outbox>,
}

impl ComponentContext {
    /// Creates a context for an instance bound to `relation`.
    #[must_use]
    pub fn new(exposer: Exposer, relation: Option<Relation>, refresh: RefreshHandle) -> Self {
        Self {
            exposer,
            relation,
            refresh,
            outbox: None,
        }
    }

    /// Attaches an outbox. Used by the bridge host.
    #[must_use]
    pub fn with_outbox(mut self, outbox: Outbox) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Returns the attached outbox.
    #[must_use]
    pub fn outbox(&self) -> Option<&Outbox> {
        self.outbox.as_ref()
    }
}

/// Identity, event hub and exposure bookkeeping of one instance.
///
/// Components embed a `ComponentBase` and return it from
/// [`Component::base`](crate::Component::base).
///
/// # Example
///
/// ```
/// use tessera_component::{sync_handler, ComponentBase, ComponentContext};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cx = ComponentContext::default();
/// let base = ComponentBase::new("Player", &cx);
/// base.wants("volume", sync_handler(|_| Ok(json!(30))));
/// assert_eq!(base.want("volume", vec![]).await, Ok(json!(30)));
/// assert_eq!(base.module(), "player");
/// # }
/// ```
pub struct ComponentBase {
    uuid: ComponentUuid,
    name: String,
    module: String,
    relation: Option<Relation>,
    hub: EventHub,
    exposer: Exposer,
    outbox: Option<Outbox>,
    refresh: RefreshHandle,
}

impl ComponentBase {
    /// Creates the base for a component called `name`.
    pub fn new(name: impl Into<String>, cx: &ComponentContext) -> Self {
        let name = name.into();
        Self {
            uuid: ComponentUuid::new(),
            module: name.to_lowercase(),
            name,
            relation: cx.relation.clone(),
            hub: EventHub::new(),
            exposer: cx.exposer.clone(),
            outbox: cx.outbox.clone(),
            refresh: cx.refresh.clone(),
        }
    }

    /// Instance identity.
    #[must_use]
    pub fn uuid(&self) -> ComponentUuid {
        self.uuid
    }

    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exposure module: the lowercased name.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Relation this instance is bound to.
    #[must_use]
    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    /// The event hub.
    #[must_use]
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// The application's exposure scope.
    #[must_use]
    pub fn exposer(&self) -> &Exposer {
        &self.exposer
    }

    /// The outbox, when hosted behind a bridge.
    #[must_use]
    pub fn outbox(&self) -> Option<&Outbox> {
        self.outbox.as_ref()
    }

    /// Asks the application for a reconciliation pass.
    pub fn request_refresh(&self) {
        self.refresh.request();
    }

    /// Appends a listener for `kind`.
    pub fn on(&self, kind: impl Into<String>, callback: Handler) {
        self.hub.on(kind, callback);
    }

    /// Emits an event to local listeners, and into the outbox if any.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidPayload`] for reserved event types,
    /// or the first listener error.
    pub async fn emit(&self, kind: &str, args: Vec<Value>) -> Result<bool, ComponentError> {
        if is_reserved(kind) {
            return Err(EventError::ReservedType(kind.to_string()).into());
        }
        if let Some(outbox) = &self.outbox {
            outbox.push(EventEnvelope::new(kind, args.clone()));
        }
        self.hub.emit(kind, args).await
    }

    /// Registers the handler for wish `name`.
    pub fn wants(&self, name: impl Into<String>, handler: Handler) {
        self.hub.wants(name, handler);
    }

    /// Invokes the handler for wish `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::WishNotImplemented`] when nobody called
    /// `wants(name, ..)`.
    pub async fn want(&self, name: &str, args: Vec<Value>) -> HandlerResult {
        self.hub.want(name, args).await
    }

    /// Publishes `handler` as `module.name`, scoped to this instance's
    /// relation.
    pub fn expose(&self, name: &str, handler: Handler) {
        if let Some(outbox) = &self.outbox {
            outbox.expose(name, Arc::clone(&handler));
        }
        self.exposer
            .expose(&self.module, name, handler, self.relation.clone());
    }

    /// Answers the built-in properties `name` and `uuid`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.clone())),
            "uuid" => Some(Value::from(self.uuid.to_string())),
            _ => None,
        }
    }

    /// Drops every listener and wish and revokes this instance's
    /// exposures.
    pub fn close(&self) {
        self.hub.clear();
        if let Some(outbox) = &self.outbox {
            outbox.clear();
        }
        let revoked = self.exposer.close(&self.module, self.relation.as_ref());
        debug!(
            component = %self.name,
            uuid = %self.uuid,
            revoked,
            "base closed"
        );
    }
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .field("relation", &self.relation)
            .field("hub", &self.hub)
            .field("hosted", &self.outbox.is_some())
            .finish()
    }
}
