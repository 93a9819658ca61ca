// 📡 Status Synchronization Bus
//
// One bus per application session, handed to every view that mutates or
// displays status. Views never hold references to one another; they publish
// `{key, status}` here and reconcile whatever they have cached.
//
// - Delivery is synchronous, in subscription order
// - No buffering: late subscribers never see earlier events
// - A panicking handler is logged and skipped, the rest still run

use crate::entity::EntityKey;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Ephemeral message: lives only for the duration of one `publish`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub key: EntityKey,
    pub status: Status,
}

impl StatusChangeEvent {
    pub fn new(key: EntityKey, status: Status) -> Self {
        StatusChangeEvent { key, status }
    }
}

type Handler = Arc<dyn Fn(&StatusChangeEvent) + Send + Sync>;

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    handlers: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn handlers(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_registered(&self, id: u64) -> bool {
        self.handlers().iter().any(|r| r.id == id)
    }

    fn remove(&self, id: u64) {
        self.handlers().retain(|r| r.id != id);
    }
}

// ============================================================================
// BUS
// ============================================================================

/// Cheap to clone; all clones share the same handler list
#[derive(Clone, Default)]
pub struct StatusBus {
    inner: Arc<BusInner>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every subsequent publish. Delivery stops when
    /// the returned `Subscription` is unsubscribed or dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&StatusChangeEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers().push(Registration {
            id,
            handler: Arc::new(handler),
        });
        tracing::trace!(subscription = id, "status bus subscribe");

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `event` to every current handler. Returns how many handlers
    /// ran to completion.
    ///
    /// Iterates a snapshot taken before the first call, so handlers may
    /// subscribe or unsubscribe freely. Handlers added mid-delivery miss this
    /// event; handlers removed before their turn are skipped.
    pub fn publish(&self, event: StatusChangeEvent) -> usize {
        let snapshot: Vec<(u64, Handler)> = self
            .inner
            .handlers()
            .iter()
            .map(|r| (r.id, Arc::clone(&r.handler)))
            .collect();

        tracing::debug!(
            key = %event.key,
            status = %event.status,
            subscribers = snapshot.len(),
            "publishing status change"
        );

        let mut delivered = 0;
        for (id, handler) in snapshot {
            if !self.inner.is_registered(id) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(subscription = id, key = %event.key, "status handler panicked");
                }
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers().len()
    }
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// Ownership of one registered handler. Releasing it (explicitly or by drop)
/// guarantees no further delivery to that handler.
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
    active: AtomicBool,
}

impl Subscription {
    /// Idempotent: only the first call removes anything
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
            tracing::trace!(subscription = self.id, "status bus unsubscribe");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ============================================================================
// TESTS
// ============================================================================
