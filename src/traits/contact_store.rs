//! Address-book store trait

use thiserror::Error;

use crate::contact::{Contact, ExtraProperty};

/// Opaque failure reported by the underlying store. Surfaced to callers as-is.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Contact not found: {0}")]
    NotFound(String),
    #[error("Access denied")]
    AccessDenied,
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Read query against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactQuery {
    All,
    /// Case-insensitive first/last/nickname fragment match
    ByName(String),
}

/// Record selector for deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactSelector {
    Identifier(String),
    Name(String),
}

/// Mutation forwarded to the store after validation
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Add(Contact),
    Update(Contact),
    Delete(ContactSelector),
}

impl WriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOp::Add(_) => "add",
            WriteOp::Update(_) => "update",
            WriteOp::Delete(_) => "delete",
        }
    }
}

/// Trait for the platform address-book store
///
/// Production: SQLite database via `rusqlite`
/// Testing: In-memory Vec
#[cfg_attr(test, mockall::automock)]
pub trait ContactStore: Send + Sync {
    /// Fetch contacts matching `query`, projected to the base fields plus `extra`
    fn read(
        &self,
        query: &ContactQuery,
        extra: &[ExtraProperty],
    ) -> Result<Vec<Contact>, StoreError>;

    /// Apply a mutation. Returns true when a record was committed or removed.
    fn write(&self, op: WriteOp) -> Result<bool, StoreError>;
}
