//! The component trait and construction results.

use crate::{ComponentBase, ComponentError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Upcast helper so components can be downcast to their concrete type.
///
/// Implemented for every `'static + Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    /// Borrows as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Converts a shared handle into `Arc<dyn Any>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A stateful, event-driven unit managed by an application.
///
/// All methods take `&self`; mutable state lives behind the component's
/// own locks so instances can be shared as `Arc<dyn Component>`.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use tessera_component::{Component, ComponentBase, ComponentContext, ComponentError};
///
/// struct Lyrics {
///     base: ComponentBase,
/// }
///
/// #[async_trait]
/// impl Component for Lyrics {
///     fn base(&self) -> &ComponentBase {
///         &self.base
///     }
///
///     async fn initialize(&self, _args: Vec<Value>) -> Result<(), ComponentError> {
///         self.base.on("track-start", tessera_component::sync_handler(|_| Ok(Value::Null)));
///         Ok(())
///     }
/// }
///
/// let lyrics = Lyrics { base: ComponentBase::new("Lyrics", &ComponentContext::default()) };
/// assert_eq!(lyrics.base().module(), "lyrics");
/// ```
#[async_trait]
pub trait Component: AsAny {
    /// Shared base state.
    fn base(&self) -> &ComponentBase;

    /// Called once after post-construct handlers ran.
    ///
    /// # Errors
    ///
    /// Any error is recorded by the reconciler; it does not abort the pass.
    async fn initialize(&self, _args: Vec<Value>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Releases the instance. The default closes the base.
    ///
    /// # Errors
    ///
    /// Any error is recorded by the reconciler; the instance is dropped
    /// regardless.
    async fn close(&self) -> Result<(), ComponentError> {
        self.base().close();
        Ok(())
    }

    /// Reads a named property. The default answers `name` and `uuid`.
    ///
    /// # Errors
    ///
    /// Implementations that fetch properties remotely may fail.
    async fn property(&self, name: &str) -> Result<Option<Value>, ComponentError> {
        Ok(self.base().property(name))
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.base(), f)
    }
}

/// Downcasts a shared component to its concrete type.
#[must_use]
pub fn downcast_arc<T: Component>(component: Arc<dyn Component>) -> Option<Arc<T>> {
    AsAny::into_any(component).downcast::<T>().ok()
}

/// Borrows a component as its concrete type.
#[must_use]
pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    AsAny::as_any(component).downcast_ref::<T>()
}

/// Future resolving to a constructed instance.
pub type PendingComponent = BoxFuture<'static, Result<Arc<dyn Component>, ComponentError>>;

/// What a constructor returns.
pub enum Constructed {
    /// The instance is ready.
    Ready(Arc<dyn Component>),
    /// The instance is still being built; the reconciler awaits it before
    /// injecting handlers.
    Pending(PendingComponent),
}

impl Constructed {
    /// Wraps a ready instance.
    pub fn ready<C: Component>(component: C) -> Self {
        Self::Ready(Arc::new(component))
    }

    /// Wraps an asynchronous construction.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Arc<dyn Component>, ComponentError>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Returns whether construction is still in progress.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Awaits the instance.
    ///
    /// # Errors
    ///
    /// Returns whatever the pending construction failed with.
    pub async fn resolve(self) -> Result<Arc<dyn Component>, ComponentError> {
        match self {
            Self::Ready(component) => Ok(component),
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Constructed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(c) => f.debug_tuple("Ready").field(c).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentContext;
    use serde_json::json;

    struct Dummy {
        base: ComponentBase,
    }

    impl Component for Dummy {
        fn base(&self) -> &ComponentBase {
            &self.base
        }
    }

    struct Other {
        base: ComponentBase,
    }

    impl Component for Other {
        fn base(&self) -> &ComponentBase {
            &self.base
        }
    }

    fn dummy() -> Arc<dyn Component> {
        Arc::new(Dummy {
            base: ComponentBase::new("Dummy", &ComponentContext::default()),
        })
    }

    #[test]
    fn downcast_to_concrete() {
        let c = dummy();
        assert!(downcast_ref::<Dummy>(c.as_ref()).is_some());
        assert!(downcast_ref::<Other>(c.as_ref()).is_none());
        assert!(downcast_arc::<Dummy>(Arc::clone(&c)).is_some());
        assert!(downcast_arc::<Other>(c).is_none());
    }

    #[tokio::test]
    async fn default_property_answers_name() {
        let c = dummy();
        assert_eq!(c.property("name").await, Ok(Some(json!("Dummy"))));
        assert_eq!(c.property("other").await, Ok(None));
    }

    #[tokio::test]
    async fn pending_resolves() {
        let constructed = Constructed::pending(async { Ok(dummy()) });
        assert!(constructed.is_pending());
        let c = constructed.resolve().await.expect("resolved");
        assert_eq!(c.base().name(), "Dummy");
    }

    #[tokio::test]
    async fn pending_failure_propagates() {
        let constructed =
            Constructed::pending(async { Err(ComponentError::ConstructFailed("offline".into())) });
        let err = constructed.resolve().await.expect_err("fails");
        assert_eq!(err, ComponentError::ConstructFailed("offline".into()));
    }
}
