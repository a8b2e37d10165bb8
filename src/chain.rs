//! Sequential async middleware chain.
//!
//! A [`Chain`] holds an ordered list of [`Handler`]s and runs them one at
//! a time over a single payload. Each handler receives ownership of the
//! payload and decides, by the [`Flow`] it returns, whether the run
//! continues with the next handler or completes early. Because a handler
//! advances the run by *returning*, it can do arbitrary async work before
//! advancing, and advancing twice is impossible by construction.
//!
//! Handlers may be added or removed at any time, including from inside a
//! running handler. Each step dispatches against the list as it exists
//! when that step begins: removing a not-yet-reached handler mid-run
//! skips it, and handlers appended mid-run are reached. Concurrent runs
//! on one chain are fully independent — all run state (cursor, payload)
//! lives on the run itself, the chain holds only the handler list.
//!
//! Two hazards are the caller's responsibility, not the chain's:
//!
//! - A handler whose future never resolves stalls its run indefinitely.
//!   The chain never polls a deadline or times a handler out.
//! - A handler that panics abandons its run mid-chain; the panic
//!   propagates to whatever is awaiting [`Chain::run`]. Wrap handlers
//!   that may panic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

/// What a handler wants the run to do next.
#[derive(Debug)]
pub enum Flow<T> {
    /// Hand the payload to the next handler (or complete, if this was
    /// the last one).
    Continue(T),
    /// Skip all remaining handlers and complete now.
    Terminate(T),
}

/// One step of a chain.
///
/// `async_trait` is required because handlers are stored and dispatched
/// as `Arc<dyn Handler<T>>`.
#[async_trait]
pub trait Handler<T>: Send + Sync {
    async fn handle(&self, payload: T) -> Flow<T>;
}

struct Entry<T> {
    /// Monotonically increasing, so append order is id order. A run's
    /// cursor is the id of the last dispatched entry; the next step is
    /// the first surviving entry with a greater id.
    id: u64,
    handler: Arc<dyn Handler<T>>,
}

/// Ordered list of handlers executed sequentially per payload.
pub struct Chain<T> {
    entries: Mutex<Vec<Entry<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Chain<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Append a handler. Insertion order is execution order.
    ///
    /// No deduplication: adding the same `Arc` twice makes it run twice
    /// per payload.
    pub fn use_handler(&self, handler: Arc<dyn Handler<T>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_entries().push(Entry { id, handler });
    }

    /// Append an async closure as a handler.
    ///
    /// Keep a clone of the returned `Arc` if you need to
    /// [`remove_handler`](Self::remove_handler) it later.
    pub fn use_fn<F, Fut>(&self, f: F) -> Arc<dyn Handler<T>>
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Flow<T>> + Send + 'static,
    {
        let handler: Arc<dyn Handler<T>> = Arc::new(FnHandler(f));
        self.use_handler(Arc::clone(&handler));
        handler
    }

    /// Remove every occurrence of `handler` (pointer identity). Absent
    /// handlers are a no-op.
    ///
    /// A run already in progress skips a removed handler it has not yet
    /// reached; steps already dispatched are unaffected.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler<T>>) {
        self.lock_entries()
            .retain(|e| !Arc::ptr_eq(&e.handler, handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Run every handler over `payload` in order, resolving with the
    /// (possibly transformed) payload once the last handler returns or a
    /// handler terminates early. An empty chain resolves immediately.
    ///
    /// The cursor is local to this call — concurrent runs on the same
    /// chain interleave freely without sharing state.
    pub async fn run(&self, mut payload: T) -> T {
        let mut last_id: Option<u64> = None;
        loop {
            let next = {
                let entries = self.lock_entries();
                entries
                    .iter()
                    .find(|e| last_id.map_or(true, |id| e.id > id))
                    .map(|e| (e.id, Arc::clone(&e.handler)))
            };
            let Some((id, handler)) = next else {
                return payload;
            };
            last_id = Some(id);
            match handler.handle(payload).await {
                Flow::Continue(next_payload) => payload = next_payload,
                Flow::Terminate(final_payload) => return final_payload,
            }
        }
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, Vec<Entry<T>>> {
        // The lock is only held for list bookkeeping, never across an
        // await, so a poisoned lock still holds a consistent list.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct FnHandler<F>(F);

#[async_trait]
impl<T, F, Fut> Handler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Flow<T>> + Send,
{
    async fn handle(&self, payload: T) -> Flow<T> {
        (self.0)(payload).await
    }
}
