//! Application state management
//!
//! `AppState` wires one store client, one authorization gate, and one change
//! listener together and exposes the public call surface.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::auth::AuthorizationGate;
use crate::client::{ContactStoreClient, ContactsError};
use crate::config::AppConfig;
use crate::contact::Contact;
use crate::listener::ChangeListener;
use crate::mocks::{InMemoryContactStore, ScriptedAuthorization};
use crate::production::{DbFileChangeSource, SqliteContactStore, StoredAuthorization};
use crate::traits::{AuthorizationProvider, AuthorizationStatus, ChangeSource, ContactStore};

/// Config key: start the change listener when the state is created
pub const LISTENER_AUTOSTART_KEY: &str = "listener.autostart";

/// Application state containing all dependencies
pub struct AppState {
    pub config: Arc<AppConfig>,
    client: ContactStoreClient,
    gate: AuthorizationGate,
    listener: Arc<ChangeListener>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ContactStore>,
        changes: Arc<dyn ChangeSource>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            config,
            client: ContactStoreClient::new(store),
            gate: AuthorizationGate::new(authorization),
            listener: Arc::new(ChangeListener::new(changes)),
        }
    }

    /// Create a new AppState backed by the SQLite store under `data_dir`.
    ///
    /// Also returns the authorization provider so the host UI can answer prompts.
    pub fn new_production(
        data_dir: &Path,
    ) -> Result<(Self, Arc<StoredAuthorization>), Box<dyn std::error::Error>> {
        tracing::info!(path = %data_dir.display(), "Initializing AppState");
        std::fs::create_dir_all(data_dir)?;

        let config_path = data_dir.join("config.sqlite");
        tracing::info!(path = %config_path.display(), "Opening config database");
        let config = Arc::new(AppConfig::open(&config_path)?);

        let db_path = data_dir.join("contacts.sqlite");
        let store = Arc::new(SqliteContactStore::open(&db_path)?);
        let changes = Arc::new(DbFileChangeSource::new(&db_path));
        let authorization = Arc::new(StoredAuthorization::new(config.clone()));

        let state = Self::new(store, changes, authorization.clone(), config);
        state.autostart_listener()?;
        Ok((state, authorization))
    }

    /// In-memory state; the store is also its own change source
    pub fn in_memory(
        authorization: ScriptedAuthorization,
    ) -> Result<(Self, InMemoryContactStore), ContactsBootError> {
        let store = InMemoryContactStore::new();
        let config = Arc::new(AppConfig::open_in_memory()?);
        let state = Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(authorization),
            config,
        );
        Ok((state, store))
    }

    fn autostart_listener(&self) -> Result<(), ContactsBootError> {
        if self.config.get_bool(LISTENER_AUTOSTART_KEY)? {
            tracing::info!("Listener autostart enabled");
            self.listener.setup()?;
        }
        Ok(())
    }

    pub fn get_auth_status(&self) -> AuthorizationStatus {
        self.gate.get_auth_status()
    }

    pub async fn request_access(&self) -> AuthorizationStatus {
        self.gate.request_access().await
    }

    pub fn get_all_contacts(
        &self,
        extra_properties: Option<&Value>,
    ) -> Result<Vec<Contact>, ContactsError> {
        self.client.get_all_contacts(extra_properties)
    }

    pub fn get_contacts_by_name(
        &self,
        name: &Value,
        extra_properties: Option<&Value>,
    ) -> Result<Vec<Contact>, ContactsError> {
        self.client.get_contacts_by_name(name, extra_properties)
    }

    pub fn add_new_contact(&self, contact: &Value) -> Result<bool, ContactsError> {
        self.client.add_new_contact(contact)
    }

    pub fn update_contact(&self, contact: &Value) -> Result<bool, ContactsError> {
        self.client.update_contact(contact)
    }

    pub fn delete_contact(&self, selector: &Value) -> Result<bool, ContactsError> {
        self.client.delete_contact(selector)
    }

    /// The process-wide change listener
    pub fn listener(&self) -> &Arc<ChangeListener> {
        &self.listener
    }
}

/// Errors while constructing an [`AppState`]
#[derive(Debug, thiserror::Error)]
pub enum ContactsBootError {
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Listener error: {0}")]
    Listener(#[from] crate::listener::ListenerError),
}
