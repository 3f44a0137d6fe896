//! Change listener: a two-state observer over the store's change notifications.
//!
//! `Idle -> Active` on [`ChangeListener::setup`], `Active -> Idle` on
//! [`ChangeListener::remove`]. Any other transition is an error. The state and
//! the subscription it owns change together under one lock, so at most one
//! subscription exists per listener.
//!
//! While active, each notification from the source is relayed once to every
//! handler registered for [`ListenerEvent::ContactChanged`], in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::traits::{ChangeSource, ChangeSourceError, SubscriptionHandle};

#[derive(Debug, Clone, Error)]
pub enum ListenerError {
    #[error("An observer is already observing for contact changes.")]
    AlreadyObserving,
    #[error("No observers are currently observing for contact changes.")]
    NotObserving,
    #[error("Change source error: {0}")]
    Source(#[from] ChangeSourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Active,
}

/// Events a listener relays to in-process handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerEvent {
    ContactChanged,
}

impl ListenerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerEvent::ContactChanged => "contact-changed",
        }
    }
}

/// Returned by `on`/`once`, used to `off` a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Handler for a relayed event. Events carry no payload.
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

struct Registration {
    id: HandlerId,
    event: ListenerEvent,
    handler: EventHandler,
    once: bool,
}

#[derive(Default)]
struct HandlerRegistry {
    next_id: u64,
    entries: Vec<Registration>,
}

impl HandlerRegistry {
    fn add(&mut self, event: ListenerEvent, handler: EventHandler, once: bool) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.entries.push(Registration {
            id,
            event,
            handler,
            once,
        });
        id
    }

    /// Handlers to run for `event`, in registration order. One-shot handlers
    /// are unregistered here so they can never run twice.
    fn take_for(&mut self, event: ListenerEvent) -> Vec<EventHandler> {
        let handlers = self
            .entries
            .iter()
            .filter(|r| r.event == event)
            .map(|r| Arc::clone(&r.handler))
            .collect();
        self.entries.retain(|r| !(r.event == event && r.once));
        handlers
    }
}

struct ActiveSubscription {
    handle: SubscriptionHandle,
    live: Arc<AtomicBool>,
}

pub struct ChangeListener {
    source: Arc<dyn ChangeSource>,
    subscription: Mutex<Option<ActiveSubscription>>,
    handlers: Arc<Mutex<HandlerRegistry>>,
}

impl ChangeListener {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self {
            source,
            subscription: Mutex::new(None),
            handlers: Arc::new(Mutex::new(HandlerRegistry::default())),
        }
    }

    /// Start observing the store. Fails if already observing.
    pub fn setup(&self) -> Result<(), ListenerError> {
        let mut subscription = self.subscription.lock().unwrap();
        if subscription.is_some() {
            return Err(ListenerError::AlreadyObserving);
        }

        let live = Arc::new(AtomicBool::new(true));
        let relay_live = Arc::clone(&live);
        let handlers = Arc::clone(&self.handlers);
        let handle = self.source.subscribe(Arc::new(move || {
            // Late notifications from a torn-down subscription are dropped
            if !relay_live.load(Ordering::SeqCst) {
                return;
            }
            let event = ListenerEvent::ContactChanged;
            let to_run = handlers.lock().unwrap().take_for(event);
            tracing::debug!(
                event = event.as_str(),
                handlers = to_run.len(),
                "Relaying store change"
            );
            for handler in to_run {
                handler();
            }
        }))?;

        *subscription = Some(ActiveSubscription { handle, live });
        tracing::info!(subscription = handle.0, "Observing contact changes");
        Ok(())
    }

    /// Stop observing the store. Fails if not observing.
    pub fn remove(&self) -> Result<(), ListenerError> {
        let mut subscription = self.subscription.lock().unwrap();
        let active = subscription.take().ok_or(ListenerError::NotObserving)?;

        active.live.store(false, Ordering::SeqCst);
        if let Err(e) = self.source.unsubscribe(active.handle) {
            // Leave the listener active so the caller can retry the teardown
            active.live.store(true, Ordering::SeqCst);
            *subscription = Some(active);
            return Err(e.into());
        }

        tracing::info!(subscription = active.handle.0, "Stopped observing contact changes");
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.lock().unwrap().is_some()
    }

    pub fn state(&self) -> ListenerState {
        if self.is_listening() {
            ListenerState::Active
        } else {
            ListenerState::Idle
        }
    }

    pub fn on(&self, event: ListenerEvent, handler: EventHandler) -> HandlerId {
        self.handlers.lock().unwrap().add(event, handler, false)
    }

    /// Register a handler that runs for the next event only
    pub fn once(&self, event: ListenerEvent, handler: EventHandler) -> HandlerId {
        self.handlers.lock().unwrap().add(event, handler, true)
    }

    /// Unregister a handler. Returns false if it was not registered.
    pub fn off(&self, event: ListenerEvent, id: HandlerId) -> bool {
        let mut registry = self.handlers.lock().unwrap();
        let before = registry.entries.len();
        registry.entries.retain(|r| !(r.event == event && r.id == id));
        registry.entries.len() != before
    }

    pub fn handler_count(&self, event: ListenerEvent) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|r| r.event == event)
            .count()
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        let active = match self.subscription.get_mut() {
            Ok(subscription) => subscription.take(),
            Err(_) => None,
        };
        if let Some(active) = active {
            active.live.store(false, Ordering::SeqCst);
            if let Err(e) = self.source.unsubscribe(active.handle) {
                tracing::debug!(error = %e, "Failed to release subscription on drop");
            }
        }
    }
}
