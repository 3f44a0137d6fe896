//! Test doubles for dependency injection
//!
//! Provides in-memory implementations of all external collaborators for
//! isolated testing and for embedding without a platform store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::contact::{self, Contact, ExtraProperty};
use crate::traits::{
    AuthorizationProvider, AuthorizationStatus, ChangeHandler, ChangeSource, ChangeSourceError,
    ContactQuery, ContactStore, StoreError, SubscriptionHandle, WriteOp,
};

// ============================================================================
// Subscribers
// ============================================================================

/// Ordered subscriber table shared by the in-memory change sources
#[derive(Clone, Default)]
struct Subscribers {
    next_id: Arc<AtomicU64>,
    handlers: Arc<Mutex<BTreeMap<u64, ChangeHandler>>>,
}

impl Subscribers {
    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.handlers.lock().unwrap().insert(id, handler);
        SubscriptionHandle(id)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChangeSourceError> {
        self.handlers
            .lock()
            .unwrap()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(ChangeSourceError::UnknownSubscription(handle.0))
    }

    fn count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Handlers run outside the lock so they may unsubscribe
    fn notify(&self) {
        let handlers: Vec<ChangeHandler> =
            self.handlers.lock().unwrap().values().cloned().collect();
        for handler in handlers {
            handler();
        }
    }
}

// ============================================================================
// InMemoryContactStore
// ============================================================================

/// In-memory contact store for testing
///
/// Also acts as its own change source: every committed write notifies
/// subscribers, the way the platform store reports changes from any process.
#[derive(Clone, Default)]
pub struct InMemoryContactStore {
    contacts: Arc<Mutex<Vec<Contact>>>,
    subscribers: Subscribers,
    writes: Arc<AtomicUsize>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store with pre-populated contacts. Missing identifiers are assigned.
    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        let store = Self::new();
        {
            let mut stored = store.contacts.lock().unwrap();
            for mut contact in contacts {
                if contact.identifier.is_none() {
                    contact.identifier = Some(uuid::Uuid::new_v4().to_string());
                }
                stored.push(contact);
            }
        }
        store
    }

    /// All stored contacts with every field (for assertions)
    pub fn snapshot(&self) -> Vec<Contact> {
        self.contacts.lock().unwrap().clone()
    }

    /// Number of write calls received, committed or not
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }
}

impl ContactStore for InMemoryContactStore {
    fn read(
        &self,
        query: &ContactQuery,
        extra: &[ExtraProperty],
    ) -> Result<Vec<Contact>, StoreError> {
        let contacts = self.contacts.lock().unwrap();
        Ok(contacts
            .iter()
            .filter(|c| match query {
                ContactQuery::All => true,
                ContactQuery::ByName(name) => c.matches_name(name),
            })
            .map(|c| c.project(extra))
            .collect())
    }

    fn write(&self, op: WriteOp) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let committed = {
            let mut contacts = self.contacts.lock().unwrap();
            match op {
                WriteOp::Add(mut new_contact) => {
                    new_contact.identifier = Some(uuid::Uuid::new_v4().to_string());
                    contacts.push(new_contact);
                    true
                }
                WriteOp::Update(update) => {
                    let index = contact::position_for_update(&contacts, &update)
                        .ok_or_else(|| StoreError::NotFound(update.describe_target()))?;
                    contacts[index].apply_update(&update);
                    true
                }
                WriteOp::Delete(selector) => {
                    match contact::position_for_selector(&contacts, &selector) {
                        Some(index) => {
                            contacts.remove(index);
                            true
                        }
                        None => false,
                    }
                }
            }
        };

        if committed {
            self.subscribers.notify();
        }
        Ok(committed)
    }
}

impl ChangeSource for InMemoryContactStore {
    fn subscribe(&self, handler: ChangeHandler) -> Result<SubscriptionHandle, ChangeSourceError> {
        Ok(self.subscribers.subscribe(handler))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChangeSourceError> {
        self.subscribers.unsubscribe(handle)
    }
}

// ============================================================================
// FailingContactStore
// ============================================================================

/// Store whose every call fails with the configured error
pub struct FailingContactStore {
    error: StoreError,
}

impl FailingContactStore {
    pub fn new(error: StoreError) -> Self {
        Self { error }
    }
}

impl ContactStore for FailingContactStore {
    fn read(&self, _: &ContactQuery, _: &[ExtraProperty]) -> Result<Vec<Contact>, StoreError> {
        Err(self.error.clone())
    }

    fn write(&self, _: WriteOp) -> Result<bool, StoreError> {
        Err(self.error.clone())
    }
}

// ============================================================================
// ManualChangeSource
// ============================================================================

/// Manual change source for testing
///
/// Emits nothing on its own. Tests call `simulate_change` to deliver a
/// notification to every subscriber.
#[derive(Clone, Default)]
pub struct ManualChangeSource {
    subscribers: Subscribers,
}

impl ManualChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulate_change(&self) {
        self.subscribers.notify();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }
}

impl ChangeSource for ManualChangeSource {
    fn subscribe(&self, handler: ChangeHandler) -> Result<SubscriptionHandle, ChangeSourceError> {
        Ok(self.subscribers.subscribe(handler))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChangeSourceError> {
        self.subscribers.unsubscribe(handle)
    }
}

// ============================================================================
// ScriptedAuthorization
// ============================================================================

/// Authorization provider with a scripted prompt answer
#[derive(Clone)]
pub struct ScriptedAuthorization {
    status: Arc<Mutex<AuthorizationStatus>>,
    answer: AuthorizationStatus,
    prompts: Arc<AtomicUsize>,
}

impl ScriptedAuthorization {
    /// Decision already made; prompting changes nothing
    pub fn fixed(status: AuthorizationStatus) -> Self {
        Self {
            status: Arc::new(Mutex::new(status)),
            answer: status,
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Starts undetermined; the prompt answers with `answer`
    pub fn prompting(answer: AuthorizationStatus) -> Self {
        Self {
            status: Arc::new(Mutex::new(AuthorizationStatus::NotDetermined)),
            answer,
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of prompts shown
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationProvider for ScriptedAuthorization {
    fn current_status(&self) -> AuthorizationStatus {
        *self.status.lock().unwrap()
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let mut status = self.status.lock().unwrap();
        *status = self.answer;
        *status
    }
}

// ============================================================================
// Tests
// ============================================================================
