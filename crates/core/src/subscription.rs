//! Subscription handles for realtime collaborators.
//!
//! Both the identity provider (session changes) and the document store (value
//! changes under a path) push updates to listeners. A [`Subscription`] is the
//! listener side of such a stream and is a scoped resource: it is released
//! exactly once, either explicitly through [`Subscription::unsubscribe`] or
//! when it is dropped.
//!
//! [`Fanout`] is the publishing side used by in-memory implementations.
//!
//! ## Delivery
//!
//! - Messages are received in publish order.
//! - Consumers must be idempotent: a later message overwrites, never appends.
//! - Nothing is persisted; a subscriber only sees messages published after it
//!   subscribed (plus an optional initial value).

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

type Release = Box<dyn FnOnce() + Send + 'static>;

/// Listener side of a realtime stream.
pub struct Subscription<M> {
    receiver: mpsc::UnboundedReceiver<M>,
    release: Option<Release>,
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<M> Subscription<M> {
    /// Wrap a receiver together with the action that detaches it from its source.
    pub fn new(receiver: mpsc::UnboundedReceiver<M>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next message. `None` once the source is gone or the
    /// subscription has been released.
    pub async fn recv(&mut self) -> Option<M> {
        if self.release.is_none() {
            return None;
        }
        self.receiver.recv().await
    }

    /// Take a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<M> {
        if self.release.is_none() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Drain everything currently queued and keep only the newest message.
    pub fn latest(&mut self) -> Option<M> {
        let mut last = None;
        while let Some(m) = self.try_recv() {
            last = Some(m);
        }
        last
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Detach from the source. Later calls (and the eventual drop) are no-ops.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            self.receiver.close();
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

struct Listener<M, K> {
    id: u64,
    key: K,
    sender: mpsc::UnboundedSender<M>,
}

struct FanoutInner<M, K> {
    next_id: u64,
    listeners: Vec<Listener<M, K>>,
}

/// In-memory publisher with per-listener keys (e.g. the path a listener watches).
///
/// - No IO
/// - Best-effort fan-out; dead listeners are dropped while publishing
pub struct Fanout<M, K = ()> {
    inner: Arc<Mutex<FanoutInner<M, K>>>,
}

impl<M, K> Clone for Fanout<M, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, K> Default for Fanout<M, K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FanoutInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<M, K> Fanout<M, K>
where
    M: Send + 'static,
    K: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under `key`, optionally seeding it with `initial`.
    pub fn subscribe_keyed(&self, key: K, initial: Option<M>) -> Subscription<M> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(m) = initial {
            // The receiver is alive in this scope, so the send cannot fail.
            let _ = tx.send(m);
        }

        let id = match self.inner.lock() {
            Ok(mut inner) => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.listeners.push(Listener { id, key, sender: tx });
                id
            }
            // A poisoned registry still hands out a subscription; it just
            // never receives published messages.
            Err(_) => u64::MAX,
        };

        let registry = Arc::downgrade(&self.inner);
        Subscription::new(rx, move || {
            if let Some(inner) = registry.upgrade() {
                if let Ok(mut inner) = inner.lock() {
                    inner.listeners.retain(|l| l.id != id);
                }
            }
        })
    }

    /// Send to every listener for which `select` yields a message.
    ///
    /// Returns the number of listeners that received one.
    pub fn publish_with(&self, mut select: impl FnMut(&K) -> Option<M>) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };

        let mut delivered = 0;
        inner.listeners.retain(|l| match select(&l.key) {
            Some(m) => {
                let alive = l.sender.send(m).is_ok();
                if alive {
                    delivered += 1;
                }
                alive
            }
            None => !l.sender.is_closed(),
        });
        delivered
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().map(|i| i.listeners.len()).unwrap_or(0)
    }
}

impl<M> Fanout<M, ()>
where
    M: Clone + Send + 'static,
{
    pub fn subscribe(&self, initial: Option<M>) -> Subscription<M> {
        self.subscribe_keyed((), initial)
    }

    pub fn publish(&self, message: M) -> usize {
        self.publish_with(|_| Some(message.clone()))
    }
}
