//! Subscriber registries and subscription handles.
//!
//! Both the line transport and the protocol engine fan notifications out
//! to a set of registered callbacks. The set is a plain list behind a
//! lock that is snapshotted before every broadcast, so handlers may
//! subscribe or unsubscribe (themselves or others) while a broadcast is
//! running.
//!
//! # Semantics
//!
//! - A handler added during a broadcast does not see that broadcast.
//! - A handler removed during a broadcast may still see that broadcast
//!   (it was in the snapshot) but nothing after it.
//! - [`Subscription::unsubscribe`] is idempotent and never blocks on a
//!   running broadcast.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

// ============================================================================
// Subscribers
// ============================================================================

/// Ordered set of registered handlers.
pub(crate) struct Subscribers<H: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<H>)>>,
}

impl<H: ?Sized> Default for Subscribers<H> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<H: ?Sized + Send + Sync + 'static> Subscribers<H> {
    /// Registers a handler and returns its key.
    #[cfg(test)]
    pub(crate) fn insert(&self, handler: Arc<H>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, handler));
        id
    }

    /// Registers a handler unless `refuse` holds, checked under the lock.
    ///
    /// Returns the handler back when refused.
    pub(crate) fn insert_unless(
        &self,
        handler: Arc<H>,
        refuse: impl FnOnce() -> bool,
    ) -> Result<u64, Arc<H>> {
        let mut entries = self.entries.lock();
        if refuse() {
            return Err(handler);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.push((id, handler));
        Ok(id)
    }

    /// Removes a handler. Returns `false` if it was already gone.
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(key, _)| *key != id);
        entries.len() != before
    }

    /// Returns the current handlers in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<H>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    /// Removes and returns every handler.
    pub(crate) fn drain(&self) -> Vec<Arc<H>> {
        self.entries
            .lock()
            .drain(..)
            .map(|(_, handler)| handler)
            .collect()
    }

    /// Returns the number of registered handlers.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Creates a [`Subscription`] that removes `id` from this set.
    pub(crate) fn subscription(self: &Arc<Self>, id: u64) -> Subscription {
        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(subscribers) = weak.upgrade() {
                subscribers.remove(id);
            }
        })
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to a registered handler.
///
/// Dropping the handle unsubscribes. Call [`detach`](Self::detach) to keep
/// the handler registered for the lifetime of its source.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A subscription with nothing to remove.
    pub(crate) fn inert() -> Self {
        Self {
            cancel: Mutex::new(None),
        }
    }

    /// Removes the handler. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.lock().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Returns `true` while the handler is still registered through this handle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.lock().is_some()
    }

    /// Leaves the handler registered and discards the handle.
    pub fn detach(self) {
        self.cancel.lock().take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Async stream of notifications fed by a subscribed handler.
///
/// Ends when the source closes. Dropping the stream unsubscribes.
pub struct Notifications<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T> Notifications<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>, subscription: Subscription) -> Self {
        Self {
            rx,
            _subscription: subscription,
        }
    }

    /// Receives the next notification, or `None` once the source closed.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Stream for Notifications<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> fmt::Debug for Notifications<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    type Handler = dyn Fn() + Send + Sync;

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let subscribers: Subscribers<str> = Subscribers::default();
        subscribers.insert(Arc::from("first"));
        subscribers.insert(Arc::from("second"));

        let names: Vec<_> = subscribers.snapshot().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let subscribers: Arc<Subscribers<Handler>> = Arc::new(Subscribers::default());
        let id = subscribers.insert(Arc::new(|| {}));
        let subscription = subscribers.subscription(id);

        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn test_drop_unsubscribes_and_detach_keeps() {
        let subscribers: Arc<Subscribers<Handler>> = Arc::new(Subscribers::default());

        let dropped = subscribers.subscription(subscribers.insert(Arc::new(|| {})));
        drop(dropped);
        assert_eq!(subscribers.len(), 0);

        let detached = subscribers.subscription(subscribers.insert(Arc::new(|| {})));
        detached.detach();
        assert_eq!(subscribers.len(), 1);
    }

    #[test]
    fn test_unsubscribe_during_broadcast() {
        let subscribers: Arc<Subscribers<Handler>> = Arc::new(Subscribers::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let victim = {
            let calls = Arc::clone(&calls);
            subscribers.insert(Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }))
        };
        let victim_subscription = Arc::new(subscribers.subscription(victim));

        {
            let victim_subscription = Arc::clone(&victim_subscription);
            subscribers.insert(Arc::new(move || victim_subscription.unsubscribe()));
        }
        {
            let calls = Arc::clone(&calls);
            subscribers.insert(Arc::new(move || {
                calls.fetch_add(10, Ordering::SeqCst);
            }));
        }

        for handler in subscribers.snapshot() {
            handler();
        }
        // the victim was in the snapshot, the last handler still ran
        assert_eq!(calls.load(Ordering::SeqCst), 11);

        for handler in subscribers.snapshot() {
            handler();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn test_subscription_outliving_source() {
        let subscribers: Arc<Subscribers<Handler>> = Arc::new(Subscribers::default());
        let subscription = subscribers.subscription(subscribers.insert(Arc::new(|| {})));
        drop(subscribers);
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_notifications_end_when_sender_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut notifications = Notifications::new(rx, Subscription::inert());

        tx.send(7).expect("send");
        drop(tx);

        assert_eq!(notifications.recv().await, Some(7));
        assert_eq!(notifications.recv().await, None);
    }
}
