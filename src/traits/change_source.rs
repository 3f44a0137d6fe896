//! Change notification trait

use thiserror::Error;

use super::ChangeHandler;

#[derive(Debug, Clone, Error)]
pub enum ChangeSourceError {
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(u64),
    #[error("Subscribe error: {0}")]
    SubscribeError(String),
}

/// Token returned by a change source for a live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Trait for observing changes to the address-book store made by any process
///
/// Production: filesystem events on the database via `notify`
/// Testing: Manual change emission
#[cfg_attr(test, mockall::automock)]
pub trait ChangeSource: Send + Sync {
    /// Register `handler` to be called once per change notification
    fn subscribe(&self, handler: ChangeHandler) -> Result<SubscriptionHandle, ChangeSourceError>;

    /// Release the subscription identified by `handle`
    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChangeSourceError>;
}
