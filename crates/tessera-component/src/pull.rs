//! Pull-based async sequences.
//!
//! Components that produce sequences (search results, a queue's upcoming
//! tracks, paginated history) expose them as [`Pull`] sources. The
//! consumer asks for one item at a time; nothing is produced ahead of
//! demand.
//!
//! | Adapter | Behavior |
//! |---------|----------|
//! | [`from_iter`] | wraps a plain iterator |
//! | [`merge`] | round-robin fan-in over several sources |
//! | [`Replay`] | caches items so several readers see the same sequence |

use crate::ComponentError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// An async source pulled one item at a time.
#[async_trait]
pub trait Pull: Send {
    /// Item type.
    type Item: Send;

    /// Produces the next item, or `None` once exhausted.
    ///
    /// # Errors
    ///
    /// Source-specific.
    async fn next(&mut self) -> Result<Option<Self::Item>, ComponentError>;

    /// Releases the source early.
    async fn close(&mut self) {}
}

/// Boxed pull source.
pub type BoxPull<T> = Box<dyn Pull<Item = T>>;

/// Source backed by an iterator.
#[derive(Debug)]
pub struct FromIter<I> {
    iter: Option<I>,
}

/// Wraps an iterator as a [`Pull`] source.
pub fn from_iter<I>(iter: I) -> FromIter<I::IntoIter>
where
    I: IntoIterator,
    I::IntoIter: Send,
    I::Item: Send,
{
    FromIter {
        iter: Some(iter.into_iter()),
    }
}

#[async_trait]
impl<I> Pull for FromIter<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Item = I::Item;

    async fn next(&mut self) -> Result<Option<I::Item>, ComponentError> {
        Ok(self.iter.as_mut().and_then(Iterator::next))
    }

    async fn close(&mut self) {
        self.iter = None;
    }
}

/// Round-robin fan-in over several sources.
pub struct Merge<T> {
    sources: Vec<BoxPull<T>>,
    cursor: usize,
}

/// Merges `sources`, taking one item from each in turn.
///
/// Exhausted sources are skipped; the merge ends when all are exhausted.
///
/// # Example
///
/// ```
/// use tessera_component::pull::{from_iter, merge, BoxPull, Pull};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let sources: Vec<BoxPull<i32>> = vec![
///     Box::new(from_iter(vec![1, 2, 3])),
///     Box::new(from_iter(vec![10])),
/// ];
/// let mut merged = merge(sources);
/// let mut out = Vec::new();
/// while let Some(n) = merged.next().await.expect("pull") {
///     out.push(n);
/// }
/// assert_eq!(out, vec![1, 10, 2, 3]);
/// # }
/// ```
#[must_use]
pub fn merge<T: Send>(sources: Vec<BoxPull<T>>) -> Merge<T> {
    Merge { sources, cursor: 0 }
}

#[async_trait]
impl<T: Send> Pull for Merge<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>, ComponentError> {
        while !self.sources.is_empty() {
            let idx = self.cursor % self.sources.len();
            match self.sources[idx].next().await? {
                Some(item) => {
                    self.cursor = idx + 1;
                    return Ok(Some(item));
                }
                None => {
                    let mut done = self.sources.remove(idx);
                    done.close().await;
                    self.cursor = idx;
                }
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        for source in &mut self.sources {
            source.close().await;
        }
        self.sources.clear();
    }
}

struct ReplayState<T> {
    source: BoxPull<T>,
    cache: Vec<T>,
    done: bool,
}

/// Cached replay of one source for several readers.
///
/// Each reader keeps its own position. Items already pulled by any
/// reader are served from the cache; new items are pulled once from the
/// shared source.
pub struct Replay<T> {
    shared: Arc<Mutex<ReplayState<T>>>,
    index: usize,
}

impl<T: Clone + Send> Replay<T> {
    /// Wraps `source`; the returned value is the first reader.
    pub fn new(source: BoxPull<T>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(ReplayState {
                source,
                cache: Vec::new(),
                done: false,
            })),
            index: 0,
        }
    }

    /// Creates another reader positioned at the start.
    #[must_use]
    pub fn clone_reader(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            index: 0,
        }
    }

    /// Number of items pulled from the source so far.
    pub async fn cached(&self) -> usize {
        self.shared.lock().await.cache.len()
    }
}

#[async_trait]
impl<T: Clone + Send> Pull for Replay<T> {
    type Item = T;

    async fn next(&mut self) -> Result<Option<T>, ComponentError> {
        let mut state = self.shared.lock().await;
        if let Some(item) = state.cache.get(self.index) {
            self.index += 1;
            return Ok(Some(item.clone()));
        }
        if state.done {
            return Ok(None);
        }
        match state.source.next().await? {
            Some(item) => {
                state.cache.push(item.clone());
                self.index += 1;
                Ok(Some(item))
            }
            None => {
                state.done = true;
                Ok(None)
            }
        }
    }

    /// Closes the shared source when this is the last reader.
    async fn close(&mut self) {
        if Arc::strong_count(&self.shared) == 1 {
            let mut state = self.shared.lock().await;
            state.source.close().await;
            state.done = true;
        }
    }
}
