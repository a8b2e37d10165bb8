//! Integration tests for the cancellation registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use courier::registry::{CancelHandle, RequestRegistry, RequestToken};
use tokio_util::sync::CancellationToken;

/// Counts cancel invocations so exactly-once semantics are observable.
#[derive(Default)]
struct CountingHandle {
    cancels: AtomicUsize,
}

impl CountingHandle {
    fn count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl CancelHandle for CountingHandle {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn register_then_deregister_cancels_exactly_once() {
    let registry = RequestRegistry::new();
    let token = RequestToken::new();
    let handle = Arc::new(CountingHandle::default());

    registry.register(token, handle.clone());
    registry.deregister(&token);

    assert_eq!(handle.count(), 1);
    assert!(!registry.contains(&token));
    assert!(registry.is_empty());
}

#[test]
fn deregister_twice_cancels_only_once() {
    let registry = RequestRegistry::new();
    let token = RequestToken::new();
    let handle = Arc::new(CountingHandle::default());

    registry.register(token, handle.clone());
    registry.deregister(&token);
    registry.deregister(&token);

    assert_eq!(handle.count(), 1);
}

#[test]
fn clear_cancels_every_entry_exactly_once_and_empties() {
    let registry = RequestRegistry::new();
    let handles: Vec<Arc<CountingHandle>> = (0..3)
        .map(|_| {
            let handle = Arc::new(CountingHandle::default());
            registry.register(RequestToken::new(), handle.clone());
            handle
        })
        .collect();

    registry.clear();

    for handle in &handles {
        assert_eq!(handle.count(), 1);
    }
    assert!(registry.is_empty());
}

#[test]
fn clear_on_empty_registry_is_a_noop() {
    let registry = RequestRegistry::new();
    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn removed_entry_is_not_cancelled_again_by_clear() {
    let registry = RequestRegistry::new();
    let tokens: Vec<RequestToken> = (0..3).map(|_| RequestToken::new()).collect();
    let handles: Vec<Arc<CountingHandle>> = tokens
        .iter()
        .map(|token| {
            let handle = Arc::new(CountingHandle::default());
            registry.register(*token, handle.clone());
            handle
        })
        .collect();

    registry.deregister(&tokens[1]);
    registry.clear();

    assert_eq!(handles[0].count(), 1);
    assert_eq!(handles[1].count(), 1);
    assert_eq!(handles[2].count(), 1);
    assert!(registry.is_empty());
}

#[test]
fn cancellation_token_double_cancel_is_unobservable() {
    let registry = RequestRegistry::new();
    let token = RequestToken::new();
    let handle = CancellationToken::new();

    registry.register(token, Arc::new(handle.clone()));
    registry.deregister(&token);
    assert!(handle.is_cancelled());

    // Cancelling again through the caller-held handle is a safe no-op.
    handle.cancel();
    assert!(handle.is_cancelled());
    assert!(registry.is_empty());
}

#[test]
fn reregistering_a_token_cancels_the_displaced_operation() {
    let registry = RequestRegistry::new();
    let token = RequestToken::new();
    let first = Arc::new(CountingHandle::default());
    let second = Arc::new(CountingHandle::default());

    registry.register(token, first.clone());
    registry.register(token, second.clone());

    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 0);
    assert_eq!(registry.len(), 1);

    registry.deregister(&token);
    assert_eq!(second.count(), 1);
}
