//! Contact store client
//!
//! Every call routes its arguments through [`crate::validation`] before the
//! store is touched. A rejected call never reaches the store.

use std::sync::Arc;

use serde_json::Value;

use crate::contact::Contact;
use crate::traits::{ContactQuery, ContactStore, StoreError, WriteOp};
use crate::validation::{self, ContactRules, ValidationError};

/// Error types for ContactStoreClient operations
#[derive(Debug, thiserror::Error)]
pub enum ContactsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ContactsError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ContactsError::Validation(_))
    }
}

pub struct ContactStoreClient {
    store: Arc<dyn ContactStore>,
}

impl ContactStoreClient {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// All contacts, base fields plus the requested extras
    pub fn get_all_contacts(
        &self,
        extra_properties: Option<&Value>,
    ) -> Result<Vec<Contact>, ContactsError> {
        let extra = validation::validate_extra_properties(extra_properties)?;
        tracing::debug!(extra = extra.len(), "Reading all contacts");

        let contacts = self
            .store
            .read(&ContactQuery::All, &extra)
            .inspect_err(|e| tracing::warn!(error = %e, "Store read failed"))?;
        Ok(contacts)
    }

    /// Contacts whose first name, last name, or nickname match `name`
    pub fn get_contacts_by_name(
        &self,
        name: &Value,
        extra_properties: Option<&Value>,
    ) -> Result<Vec<Contact>, ContactsError> {
        let name = validation::validate_name(name)?;
        let extra = validation::validate_extra_properties(extra_properties)?;
        tracing::debug!(name = %name, extra = extra.len(), "Reading contacts by name");

        let contacts = self
            .store
            .read(&ContactQuery::ByName(name), &extra)
            .inspect_err(|e| tracing::warn!(error = %e, "Store read failed"))?;
        Ok(contacts)
    }

    /// Create a contact. The generated identifier is not returned; re-query for it.
    pub fn add_new_contact(&self, contact: &Value) -> Result<bool, ContactsError> {
        let mut contact = validation::validate_contact(contact, ContactRules::default())?;
        // Identifiers are assigned by the store
        contact.identifier = None;
        self.forward(WriteOp::Add(contact))
    }

    /// Update the record resolved by identifier, or by name when no identifier is given
    pub fn update_contact(&self, contact: &Value) -> Result<bool, ContactsError> {
        let contact = validation::validate_contact(contact, ContactRules::default())?;
        self.forward(WriteOp::Update(contact))
    }

    /// Delete by `{ name, identifier }`. At least one must be supplied.
    pub fn delete_contact(&self, selector: &Value) -> Result<bool, ContactsError> {
        let request = validation::validate_name_or_identifier(selector)?;
        let selector = request.selector().ok_or(ValidationError::MissingSelector)?;
        self.forward(WriteOp::Delete(selector))
    }

    fn forward(&self, op: WriteOp) -> Result<bool, ContactsError> {
        let kind = op.as_str();
        tracing::debug!(op = kind, "Forwarding contact mutation");
        let committed = self
            .store
            .write(op)
            .inspect_err(|e| tracing::warn!(op = kind, error = %e, "Store write failed"))?;
        Ok(committed)
    }
}
