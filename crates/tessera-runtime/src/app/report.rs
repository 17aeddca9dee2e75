//! Outcome of a reconciliation pass.

use crate::RuntimeError;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tessera_types::{ErrorCode, Relation};

/// A lifecycle step that failed for one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleFailure {
    /// Relation of the affected instance, if any.
    pub relation: Option<Relation>,
    /// What went wrong.
    pub error: RuntimeError,
}

impl LifecycleFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(relation: Option<Relation>, error: RuntimeError) -> Self {
        Self { relation, error }
    }
}

impl fmt::Display for LifecycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error.code(), self.error)
    }
}

/// Counts and failures of one pass (`initialize`, `refresh` or `close`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Instances constructed by the pass.
    pub created: usize,
    /// Instances closed by the pass.
    pub closed: usize,
    /// Isolated lifecycle failures.
    pub failures: Vec<LifecycleFailure>,
}

impl PassReport {
    /// Number of failures.
    #[must_use]
    pub fn exceptions(&self) -> usize {
        self.failures.len()
    }

    /// Returns whether the pass had no failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, relation: Option<Relation>, error: RuntimeError) {
        self.failures.push(LifecycleFailure::new(relation, error));
    }
}

/// A scheduled refresh pass.
///
/// Clones await the same pass. Dropping every clone does not cancel it.
#[derive(Clone)]
pub struct PendingRefresh {
    inner: Shared<BoxFuture<'static, PassReport>>,
}

impl PendingRefresh {
    pub(crate) fn new(inner: Shared<BoxFuture<'static, PassReport>>) -> Self {
        Self { inner }
    }

    /// Returns whether two handles await the same pass.
    #[must_use]
    pub fn same_pass(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl Future for PendingRefresh {
    type Output = PassReport;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<PassReport> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for PendingRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRefresh")
            .field("done", &self.inner.peek().is_some())
            .finish()
    }
}
