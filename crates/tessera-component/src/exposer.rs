//! Named-function registry shared by every component of an application.
//!
//! The exposer publishes functions under `module.name`. Several
//! components may register the same pair, each scoped to its own
//! relation; a call fans out to every registrant the [`Caller`] admits
//! and aggregates the results.
//!
//! ```text
//! scope
//!  └── "player"                     module
//!       └── "pause"                 Dispatcher (installed once)
//!            ├── (fn_a, Some(guild_a))
//!            ├── (fn_b, Some(guild_b))
//!            └── (fn_c, None)       public
//! ```
//!
//! One exposer is created per application and passed down to every
//! component through its construction context; it is never global.

use crate::{ComponentError, Handler};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tessera_event::Caller;
use tessera_types::{same_relation, Relation};
use tracing::debug;

/// Aggregated result of an exposed-function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// No registrant matched.
    None,
    /// Exactly one registrant matched.
    One(Value),
    /// Several registrants matched; results in registration order.
    Many(Vec<Value>),
}

impl Dispatch {
    fn from_results(mut results: Vec<Value>) -> Self {
        match results.len() {
            0 => Self::None,
            1 => Self::One(results.remove(0)),
            _ => Self::Many(results),
        }
    }

    /// Flattens into a single JSON value (`null`, the value, or an array).
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::None => Value::Null,
            Self::One(v) => v,
            Self::Many(vs) => Value::Array(vs),
        }
    }
}

struct Registrant {
    handler: Handler,
    relation: Option<Relation>,
}

/// The callable installed for one `(module, name)` pair.
pub struct Dispatcher {
    module: String,
    name: String,
    registrants: RwLock<Vec<Registrant>>,
}

impl Dispatcher {
    fn new(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            registrants: RwLock::new(Vec::new()),
        }
    }

    /// Invokes every registrant admitted by `caller`.
    ///
    /// Matching registrants are started in registration order and awaited
    /// together.
    ///
    /// # Errors
    ///
    /// Returns the first registrant error.
    pub async fn call(&self, caller: &Caller, args: Vec<Value>) -> Result<Dispatch, ComponentError> {
        let matched: Vec<Handler> = self
            .registrants
            .read()
            .iter()
            .filter(|r| caller.admits(r.relation.as_ref()))
            .map(|r| Arc::clone(&r.handler))
            .collect();

        let results = join_all(matched.iter().map(|h| h(args.clone()))).await;
        let values = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Dispatch::from_results(values))
    }

    /// Number of registrants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrants.read().len()
    }

    /// Returns whether the dispatcher has no registrants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrants.read().is_empty()
    }

    fn push(&self, handler: Handler, relation: Option<Relation>) {
        self.registrants.write().push(Registrant { handler, relation });
    }

    fn revoke(&self, relation: Option<&Relation>) -> usize {
        let mut registrants = self.registrants.write();
        let before = registrants.len();
        registrants.retain(|r| !same_relation(r.relation.as_ref(), relation));
        before - registrants.len()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("registrants", &self.len())
            .finish()
    }
}

type Scope = HashMap<String, HashMap<String, Arc<Dispatcher>>>;

/// Handle to an application's exposure scope.
///
/// Cloning shares the scope.
#[derive(Clone, Default)]
pub struct Exposer {
    scope: Arc<RwLock<Scope>>,
}

impl Exposer {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `handler` as `module.name`, scoped to `relation`.
    ///
    /// The first registration for a pair installs its dispatcher; later
    /// registrations append to the same dispatcher.
    pub fn expose(
        &self,
        module: &str,
        name: &str,
        handler: Handler,
        relation: Option<Relation>,
    ) -> Arc<Dispatcher> {
        let dispatcher = {
            let mut scope = self.scope.write();
            let entry = scope
                .entry(module.to_string())
                .or_default()
                .entry(name.to_string())
                .or_insert_with(|| {
                    debug!(module, name, "installing dispatcher");
                    Arc::new(Dispatcher::new(module, name))
                });
            Arc::clone(entry)
        };
        dispatcher.push(handler, relation);
        dispatcher
    }

    /// Returns the dispatcher installed for `module.name`.
    #[must_use]
    pub fn dispatcher(&self, module: &str, name: &str) -> Option<Arc<Dispatcher>> {
        self.scope
            .read()
            .get(module)
            .and_then(|names| names.get(name))
            .cloned()
    }

    /// Calls `module.name` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotExposed`] for an unknown pair, or the
    /// first registrant error.
    pub async fn call(
        &self,
        module: &str,
        name: &str,
        caller: &Caller,
        args: Vec<Value>,
    ) -> Result<Dispatch, ComponentError> {
        let dispatcher =
            self.dispatcher(module, name)
                .ok_or_else(|| ComponentError::NotExposed {
                    module: module.to_string(),
                    name: name.to_string(),
                })?;
        dispatcher.call(caller, args).await
    }

    /// Revokes every registrant of `module` registered with `relation`.
    ///
    /// `None` revokes only relation-less registrants. The module is
    /// removed from the scope once it has no registrants left. Returns the
    /// number of registrants removed.
    pub fn close(&self, module: &str, relation: Option<&Relation>) -> usize {
        let mut scope = self.scope.write();
        let Some(names) = scope.get(module) else {
            return 0;
        };

        let removed: usize = names.values().map(|d| d.revoke(relation)).sum();
        if names.values().all(|d| d.is_empty()) {
            scope.remove(module);
            debug!(module, "module removed from scope");
        }
        removed
    }

    /// Returns whether `module.name` currently has a dispatcher.
    #[must_use]
    pub fn is_exposed(&self, module: &str, name: &str) -> bool {
        self.dispatcher(module, name).is_some()
    }

    /// Lists the modules in scope, sorted.
    #[must_use]
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.scope.read().keys().cloned().collect();
        modules.sort();
        modules
    }

    /// Drops the whole scope.
    pub fn clear(&self) {
        self.scope.write().clear();
    }
}

impl fmt::Debug for Exposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exposer")
            .field("modules", &self.modules())
            .finish()
    }
}
