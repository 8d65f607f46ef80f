//! Listener registration with one disposer per registration.
//!
//! An [`EventTarget`] plays the role of the page's `window` (interaction
//! events) and of the form's outbound channel (submit notifications). Every
//! `add_listener` hands back a [`Subscription`]; dropping or disposing it
//! removes the listener, so teardown is tied to ownership.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub trait Event {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Remove the listener before its first delivery runs.
    pub once: bool,
}

impl ListenerOptions {
    pub const fn once() -> Self {
        Self { once: true }
    }

    pub const fn persistent() -> Self {
        Self { once: false }
    }
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E: Event> {
    id: u64,
    kind: E::Kind,
    once: bool,
    handler: Handler<E>,
}

struct Registry<E: Event> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

impl<E: Event> Registry<E> {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        before != self.listeners.len()
    }
}

pub struct EventTarget<E: Event> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: Event> Clone for EventTarget<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: Event> Default for EventTarget<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event + 'static> EventTarget<E> {
    pub fn add_listener<F>(&self, kind: E::Kind, options: ListenerOptions, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push(Listener {
                id,
                kind,
                once: options.once,
                handler: Arc::new(handler),
            });
            id
        };

        let registry: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(id);
            }
        })
    }
}

impl<E: Event> EventTarget<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Delivers `event` to every listener registered for its kind and
    /// returns how many handlers ran.
    pub fn dispatch(&self, event: &E) -> usize {
        let kind = event.kind();
        let handlers: Vec<Handler<E>> = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            let handlers = registry
                .listeners
                .iter()
                .filter(|l| l.kind == kind)
                .map(|l| Arc::clone(&l.handler))
                .collect();
            registry.listeners.retain(|l| !(l.once && l.kind == kind));
            handlers
        };

        // Lock released: a handler may register or dispose listeners.
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    pub fn listener_count_for(&self, kind: E::Kind) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }
}

/// Disposer for a single registration.
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn dispose(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.detach.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposers released together on teardown.
#[derive(Debug, Default)]
pub struct Subscriptions {
    inner: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.inner.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn dispose_all(&mut self) {
        for mut subscription in self.inner.drain(..) {
            subscription.dispose();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    PointerMove,
    Scroll,
    KeyPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
}

impl InteractionEvent {
    pub const fn pointer_move() -> Self {
        Self {
            kind: InteractionKind::PointerMove,
        }
    }

    pub const fn scroll() -> Self {
        Self {
            kind: InteractionKind::Scroll,
        }
    }

    pub const fn key_press() -> Self {
        Self {
            kind: InteractionKind::KeyPress,
        }
    }
}

impl Event for InteractionEvent {
    type Kind = InteractionKind;

    fn kind(&self) -> InteractionKind {
        self.kind
    }
}

/// Page-level target receiving pointer, scroll and key events.
pub type Window = EventTarget<InteractionEvent>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&InteractionEvent) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        (hits, move |_: &InteractionEvent| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let window = Window::new();
        let (hits, handler) = counter();
        let _sub = window.add_listener(InteractionKind::Scroll, ListenerOptions::once(), handler);

        assert_eq!(window.dispatch(&InteractionEvent::scroll()), 1);
        assert_eq!(window.dispatch(&InteractionEvent::scroll()), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(window.listener_count(), 0);
    }

    #[test]
    fn persistent_listener_only_sees_its_kind() {
        let window = Window::new();
        let (hits, handler) = counter();
        let _sub = window.add_listener(InteractionKind::KeyPress, ListenerOptions::persistent(), handler);

        window.dispatch(&InteractionEvent::pointer_move());
        window.dispatch(&InteractionEvent::key_press());
        window.dispatch(&InteractionEvent::key_press());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_subscription_deregisters() {
        let window = Window::new();
        let (hits, handler) = counter();
        let sub = window.add_listener(InteractionKind::PointerMove, ListenerOptions::persistent(), handler);
        assert_eq!(window.listener_count_for(InteractionKind::PointerMove), 1);

        drop(sub);
        window.dispatch(&InteractionEvent::pointer_move());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(window.listener_count(), 0);
    }

    #[test]
    fn dispose_is_idempotent_and_outlives_target() {
        let window = Window::new();
        let (_hits, handler) = counter();
        let mut sub = window.add_listener(InteractionKind::Scroll, ListenerOptions::once(), handler);
        drop(window);

        sub.dispose();
        sub.dispose();
        assert!(sub.is_disposed());
    }

    #[test]
    fn disposer_bag_releases_every_registration() {
        let window = Window::new();
        let mut bag = Subscriptions::new();
        for kind in [InteractionKind::PointerMove, InteractionKind::Scroll, InteractionKind::KeyPress] {
            let (_hits, handler) = counter();
            bag.push(window.add_listener(kind, ListenerOptions::once(), handler));
        }
        assert_eq!(window.listener_count(), 3);

        bag.dispose_all();
        assert!(bag.is_empty());
        assert_eq!(window.listener_count(), 0);
    }

    #[test]
    fn handler_may_register_during_dispatch() {
        let window = Window::new();
        let inner = window.clone();
        let nested: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&nested);
        let _sub = window.add_listener(InteractionKind::Scroll, ListenerOptions::once(), move |_| {
            let sub = inner.add_listener(InteractionKind::Scroll, ListenerOptions::once(), |_| {});
            slot.lock().unwrap().push(sub);
        });

        assert_eq!(window.dispatch(&InteractionEvent::scroll()), 1);
        assert_eq!(window.listener_count(), 1);
    }
}
