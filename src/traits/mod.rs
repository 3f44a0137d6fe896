//! Trait definitions for dependency injection
//!
//! Every platform collaborator (address-book store, change notifications,
//! permission state) is abstracted behind a trait so the contract layer can be
//! exercised without the host platform.

use std::sync::Arc;

mod authorization;
mod change_source;
mod contact_store;

pub use authorization::{AuthorizationProvider, AuthorizationStatus};
pub use change_source::{ChangeSource, ChangeSourceError, SubscriptionHandle};
pub use contact_store::{ContactQuery, ContactSelector, ContactStore, StoreError, WriteOp};

#[cfg(test)]
pub use authorization::MockAuthorizationProvider;
#[cfg(test)]
pub use change_source::MockChangeSource;
#[cfg(test)]
pub use contact_store::MockContactStore;

/// Callback invoked by a change source for every store change notification
pub type ChangeHandler = Arc<dyn Fn() + Send + Sync>;
