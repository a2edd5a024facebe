//! Index publication slot
//!
//! Components that start before an index exists (the HTTP server is up
//! while the cluster bootstrap is still running) hold an
//! [`IndexSubscriber`] and pick the index up once it is published.

use std::sync::Arc;
use tokio::sync::watch;

/// Publish-once cell for a shared index.
pub struct IndexSlot<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T> Default for IndexSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexSlot<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Publish `value`. Only the first publication takes effect.
    pub fn publish(&self, value: Arc<T>) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> IndexSubscriber<T> {
        IndexSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of an [`IndexSlot`].
pub struct IndexSubscriber<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Clone for IndexSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> IndexSubscriber<T> {
    /// The published value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }
}
