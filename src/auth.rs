//! Authorization gate over the host permission system

use std::sync::Arc;

use crate::traits::{AuthorizationProvider, AuthorizationStatus};

pub struct AuthorizationGate {
    provider: Arc<dyn AuthorizationProvider>,
}

impl AuthorizationGate {
    pub fn new(provider: Arc<dyn AuthorizationProvider>) -> Self {
        Self { provider }
    }

    /// Current status, read fresh from the provider on every call
    pub fn get_auth_status(&self) -> AuthorizationStatus {
        self.provider.current_status()
    }

    /// Prompt the user if no decision exists yet and wait for the answer.
    ///
    /// Resolves immediately with the stored decision otherwise. There is no
    /// timeout; race this future against a timer if one is needed.
    pub async fn request_access(&self) -> AuthorizationStatus {
        let current = self.provider.current_status();
        if current.is_determined() {
            tracing::debug!(status = %current, "Authorization already determined");
            return current;
        }

        tracing::info!("Requesting contacts authorization");
        let status = self.provider.request_authorization().await;
        tracing::info!(status = %status, "Contacts authorization resolved");
        status
    }
}
