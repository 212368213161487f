//! Cancellable event subscriptions
//!
//! Transcripts and polling results are delivered through an [`EventBus`] backed by a
//! `tokio::sync::broadcast` channel. Each subscriber gets its own forwarding task, so a
//! handler sees events in publish order, and once [`Subscription::unsubscribe`] returns no
//! new handler call starts. Handlers may unsubscribe themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events buffered per subscriber before the slowest one starts skipping
pub const EVENT_BUS_CAPACITY: usize = 64;

type Handler<T> = Box<dyn FnMut(&T) + Send>;

struct HandlerSlot<T> {
    cancelled: bool,
    /// Taken out by the forwarding task for the duration of each call
    handler: Option<Handler<T>>,
}

fn lock<G>(mutex: &Mutex<G>) -> MutexGuard<'_, G> {
    // A panicking handler must not wedge its subscription
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fan-out of events to any number of handlers
pub struct EventBus<T> {
    sender: broadcast::Sender<T>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a handler. It stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped. Only events published after this call are delivered.
    ///
    /// Spawns the forwarding task, so this must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Mutex::new(HandlerSlot {
            cancelled: false,
            handler: Some(Box::new(handler) as Handler<T>),
        }));
        let receiver = self.sender.subscribe();

        let task = tokio::spawn(forward(id, receiver, Arc::clone(&slot)));

        Subscription::new(id, move || {
            let handler = {
                let mut slot = lock(&slot);
                slot.cancelled = true;
                slot.handler.take()
            };
            drop(handler);
            task.abort();
        })
    }

    /// Queue an event for every current subscriber
    pub fn publish(&self, event: T) {
        // No receivers is not an error: nobody is listening yet or everyone left
        let _ = self.sender.send(event);
    }
}

async fn forward<T>(id: u64, mut receiver: broadcast::Receiver<T>, slot: Arc<Mutex<HandlerSlot<T>>>)
where
    T: Clone + Send + 'static,
{
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(subscription_id = id, skipped, "Subscriber fell behind, events dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let mut handler = {
            let mut state = lock(&slot);
            match state.handler.take() {
                Some(handler) if !state.cancelled => handler,
                _ => break,
            }
        };

        // The lock is released here so the handler may unsubscribe itself
        handler(&event);

        let mut state = lock(&slot);
        if state.cancelled {
            break;
        }
        state.handler = Some(handler);
    }

    debug!(subscription_id = id, "Subscription finished");
}

/// Handle returned by `subscribe`; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap an arbitrary cancellation action
    pub fn new<F>(id: u64, cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop delivery. No handler call starts after this returns; a call already running on
    /// another thread is not waited for.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
