//! Persisted contacts authorization
//!
//! The decision lives in `AppConfig` under [`AUTHORIZATION_KEY`]. A request
//! made while undetermined suspends until the host's permission UI calls
//! [`StoredAuthorization::respond`]; every pending request receives that one
//! decision.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::{AppConfig, ConfigError, AUTHORIZATION_KEY};
use crate::traits::{AuthorizationProvider, AuthorizationStatus};

pub struct StoredAuthorization {
    config: Arc<AppConfig>,
    waiters: Mutex<Vec<oneshot::Sender<AuthorizationStatus>>>,
}

impl StoredAuthorization {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            waiters: Mutex::new(Vec::new()),
        }
    }

    fn stored_status(&self) -> AuthorizationStatus {
        match self.config.get(AUTHORIZATION_KEY) {
            Ok(Some(value)) => AuthorizationStatus::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Ignoring unrecognised authorization value");
                AuthorizationStatus::NotDetermined
            }),
            Ok(None) => AuthorizationStatus::NotDetermined,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read authorization state");
                AuthorizationStatus::NotDetermined
            }
        }
    }

    /// Record the user's decision and resolve every pending request with it
    pub fn respond(&self, status: AuthorizationStatus) -> Result<usize, ConfigError> {
        let mut waiters = self.waiters.lock().unwrap();
        self.config.set(AUTHORIZATION_KEY, status.as_str())?;

        let resolved = waiters.len();
        for waiter in waiters.drain(..) {
            // A dropped receiver just means the caller stopped waiting
            let _ = waiter.send(status);
        }
        tracing::info!(status = %status, resolved, "Recorded contacts authorization");
        Ok(resolved)
    }

    /// Forget the decision so the next request prompts again
    pub fn reset(&self) -> Result<(), ConfigError> {
        self.config.delete(AUTHORIZATION_KEY)?;
        tracing::info!("Reset contacts authorization");
        Ok(())
    }

    /// Requests currently waiting for a decision
    pub fn pending_requests(&self) -> usize {
        self.waiters.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthorizationProvider for StoredAuthorization {
    fn current_status(&self) -> AuthorizationStatus {
        self.stored_status()
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        let rx = {
            // Check and enqueue under the lock so a concurrent respond() can't slip between
            let mut waiters = self.waiters.lock().unwrap();
            let current = self.stored_status();
            if current.is_determined() {
                return current;
            }
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            rx
        };

        tracing::info!("Waiting for contacts permission decision");
        match rx.await {
            Ok(status) => status,
            Err(_) => self.stored_status(),
        }
    }
}
