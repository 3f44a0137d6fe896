//! Platform permission trait

use serde::{Deserialize, Serialize};

/// Permission state governing access to the address book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
    Limited,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::NotDetermined => "NotDetermined",
            AuthorizationStatus::Denied => "Denied",
            AuthorizationStatus::Authorized => "Authorized",
            AuthorizationStatus::Limited => "Limited",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NotDetermined" => Some(AuthorizationStatus::NotDetermined),
            "Denied" => Some(AuthorizationStatus::Denied),
            "Authorized" => Some(AuthorizationStatus::Authorized),
            "Limited" => Some(AuthorizationStatus::Limited),
            _ => None,
        }
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, AuthorizationStatus::NotDetermined)
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for the host permission system
///
/// Production: decision persisted in `AppConfig`, answered by the host UI
/// Testing: Scripted answers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Current permission state. Must not block or prompt.
    fn current_status(&self) -> AuthorizationStatus;

    /// Show the permission prompt and wait for the user's answer
    async fn request_authorization(&self) -> AuthorizationStatus;
}
