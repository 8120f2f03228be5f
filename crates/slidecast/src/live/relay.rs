//! Fan-out of events to every connected viewer.
//!
//! Each subscriber owns a bounded queue. Emission never waits: a full queue
//! loses that one event, and a closed queue is pruned.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

pub struct Relay<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    subscribers: DashMap<u64, mpsc::Sender<E>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl<E> Clone for Relay<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Largest per-subscriber queue a relay will allocate.
pub const MAX_CAPACITY: usize = 65_536;

impl<E: Clone + Send + 'static> Relay<E> {
    /// `capacity` is clamped into `1..=MAX_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                capacity: capacity.clamp(1, MAX_CAPACITY),
            }),
        }
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> Subscription<E> {
        self.subscribe_with(Vec::new())
    }

    /// Register a new queue whose first items are `initial`, ahead of
    /// anything emitted afterwards.
    pub fn subscribe_with(&self, initial: Vec<E>) -> Subscription<E> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity + initial.len());
        for event in initial {
            // Fresh channel sized for the backlog; cannot fail.
            let _ = tx.try_send(event);
        }
        self.inner.subscribers.insert(id, tx);
        debug!(subscriber_id = id, "subscriber registered");
        Subscription {
            id,
            rx,
            relay: Arc::downgrade(&self.inner),
        }
    }

    /// Push `event` to every live subscriber. Returns how many received it.
    pub fn emit(&self, event: &E) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for entry in self.inner.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    trace!(subscriber_id = *entry.key(), "queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }
        for id in closed {
            self.unsubscribe(id);
        }
        delivered
    }

    pub fn unsubscribe(&self, id: u64) {
        if self.inner.subscribers.remove(&id).is_some() {
            debug!(subscriber_id = id, "subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

/// Receiving end of one subscriber's queue. Dropping it deregisters.
pub struct Subscription<E> {
    id: u64,
    rx: mpsc::Receiver<E>,
    relay: std::sync::Weak<Inner<E>>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> u64 {
        self.id
    }

    #[cfg(test)]
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }
}

impl<E> Stream for Subscription<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        self.rx.poll_recv(cx)
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(inner) = self.relay.upgrade() {
            inner.subscribers.remove(&self.id);
            debug!(subscriber_id = self.id, "subscriber disconnected");
        }
    }
}
