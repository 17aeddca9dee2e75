//! Type-erased async handlers.
//!
//! Event callbacks, wish handlers and exposed functions all share one
//! shape: JSON arguments in, a boxed future of a JSON result out.

use crate::ComponentError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Result produced by every handler.
pub type HandlerResult = Result<Value, ComponentError>;

/// Shared, type-erased async handler.
pub type Handler = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Wraps an async closure into a [`Handler`].
///
/// # Example
///
/// ```
/// use tessera_component::handler;
/// use serde_json::{json, Value};
///
/// let double = handler(|args: Vec<Value>| async move {
///     let n = args.first().and_then(Value::as_i64).unwrap_or(0);
///     Ok(json!(n * 2))
/// });
/// # let _ = double;
/// ```
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |args| f(args).boxed())
}

/// Wraps a synchronous closure into a [`Handler`].
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(move |args| {
        let result = f(args);
        async move { result }.boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn async_handler_runs() {
        let h = handler(|args: Vec<Value>| async move { Ok(json!(args.len())) });
        assert_eq!(h(vec![json!(1), json!(2)]).await, Ok(json!(2)));
    }

    #[tokio::test]
    async fn sync_handler_propagates_error() {
        let h = sync_handler(|_| Err(ComponentError::failed("boom")));
        assert_eq!(h(vec![]).await, Err(ComponentError::failed("boom")));
    }
}
