//! Live registry of cancellable in-flight requests.
//!
//! The [`RequestRegistry`] is the single place that knows about every
//! outstanding request. Each entry pairs an opaque [`RequestToken`] with
//! a [`CancelHandle`], so one request can be cancelled by token and all
//! of them can be cancelled at once (e.g. on navigation or logout)
//! without call sites tracking their own handles.
//!
//! Deregistration always invokes the handle's cancel capability, even
//! when triggered by successful settlement — [`CancelHandle::cancel`] is
//! required to be a no-op against an already-settled operation, which
//! `tokio_util`'s `CancellationToken` satisfies.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Cancel capability of one in-flight operation.
///
/// Implementations must make `cancel` idempotent and a safe no-op once
/// the operation has settled; the registry calls it unconditionally on
/// removal, success and failure included.
pub trait CancelHandle: Send + Sync {
    fn cancel(&self);
}

impl CancelHandle for CancellationToken {
    fn cancel(&self) {
        CancellationToken::cancel(self);
    }
}

/// Opaque key identifying one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(Uuid);

impl RequestToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Token → cancel-handle mapping for all outstanding requests.
///
/// Mutated from whichever task observes a settlement; the shard-locked
/// map needs no async lock and nothing is held across an await.
#[derive(Default)]
pub struct RequestRegistry {
    inflight: DashMap<RequestToken, Arc<dyn CancelHandle>>,
}

impl RequestRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }

    /// Insert the mapping `token` → `handle`.
    ///
    /// Tokens are expected to be unique per in-flight request. If the
    /// token is already present the previous handle is cancelled and
    /// replaced, so a displaced operation is never left running
    /// untracked.
    pub fn register(&self, token: RequestToken, handle: Arc<dyn CancelHandle>) {
        if let Some(previous) = self.inflight.insert(token, handle) {
            previous.cancel();
            tracing::warn!(token = %token, "token re-registered; cancelled displaced request");
        }
    }

    /// Cancel and remove the entry for `token`. Absent tokens are a
    /// no-op.
    ///
    /// Called on every settlement, so the cancel here is usually issued
    /// against an operation that already finished — by the
    /// [`CancelHandle`] contract that has no observable effect.
    pub fn deregister(&self, token: &RequestToken) {
        if let Some((_, handle)) = self.inflight.remove(token) {
            handle.cancel();
        }
    }

    /// Cancel every registered operation once each and empty the
    /// registry. Iteration order is unspecified. Clearing an empty
    /// registry is a no-op.
    pub fn clear(&self) {
        let before = self.inflight.len();
        self.inflight.retain(|_, handle| {
            handle.cancel();
            false
        });
        if before > 0 {
            tracing::info!(cancelled = before, "cleared in-flight request registry");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    #[must_use]
    pub fn contains(&self, token: &RequestToken) -> bool {
        self.inflight.contains_key(token)
    }
}
