/*
[INPUT]:  Event handlers registered by callers
[OUTPUT]: Handler fan-out and unsubscribe handles
[POS]:    Auth layer - cancellable event subscriptions
[UPDATE]: When subscription lifetime rules change
*/

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Callback invoked with each emitted event
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Slots<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
}

/// Set of handlers for one event type
pub struct HandlerRegistry<E> {
    slots: Arc<Mutex<Slots<E>>>,
}

impl<E: 'static> HandlerRegistry<E> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register a handler; it stays registered until the returned handle is
    /// dropped or unsubscribed.
    pub fn subscribe(&self, handler: Handler<E>) -> Subscription {
        let id = {
            let mut slots = lock(&self.slots);
            let id = slots.next_id;
            slots.next_id += 1;
            slots.handlers.push((id, handler));
            id
        };

        let weak: Weak<Mutex<Slots<E>>> = Arc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = weak.upgrade() {
                lock(&slots).handlers.retain(|(slot_id, _)| *slot_id != id);
            }
        })
    }

    /// Invoke every registered handler.
    ///
    /// Handlers run outside the registry lock, so they may subscribe or
    /// unsubscribe themselves.
    pub fn emit(&self, event: &E) {
        let handlers: Vec<Handler<E>> = lock(&self.slots)
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for HandlerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = lock(&self.slots).handlers.len();
        f.debug_struct("HandlerRegistry").field("handlers", &count).finish()
    }
}

fn lock<E>(slots: &Mutex<Slots<E>>) -> MutexGuard<'_, Slots<E>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle that removes its handler when dropped
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that owns no handler
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Remove the handler now
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

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_handlers_until_unsubscribed() {
        let registry: HandlerRegistry<u32> = HandlerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let subscription = registry.subscribe(Arc::new(move |value: &u32| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        }));

        registry.emit(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        subscription.unsubscribe();
        registry.emit(&5);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry: HandlerRegistry<()> = HandlerRegistry::new();
        {
            let _first = registry.subscribe(Arc::new(|_: &()| {}));
            let _second = registry.subscribe(Arc::new(|_: &()| {}));
            assert_eq!(registry.len(), 2);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let registry: HandlerRegistry<()> = HandlerRegistry::new();
        let subscription = registry.subscribe(Arc::new(|_: &()| {}));
        drop(registry);
        subscription.unsubscribe();
    }
}
