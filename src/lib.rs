//! ContactBridge - validated access to the system address book
//!
//! This library provides a contract layer over a platform-managed contact
//! store: input validation, an authorization gate, and a single change
//! listener, organized around trait-based dependency injection for testability.

pub mod auth;
pub mod client;
pub mod config;
pub mod contact;
pub mod listener;
pub mod mocks;
pub mod production;
pub mod traits;
pub mod validation;

mod state;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use auth::AuthorizationGate;
pub use client::{ContactStoreClient, ContactsError};
pub use contact::{Contact, ExtraProperty};
pub use listener::{ChangeListener, ListenerError, ListenerEvent, ListenerState};
pub use state::{AppState, ContactsBootError, LISTENER_AUTOSTART_KEY};
pub use traits::AuthorizationStatus;
pub use validation::ValidationError;

/// Initialize logging to stderr and, when `log_dir` is given, a daily log file.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "contactbridge=info,contactbridge_lib=info".into()),
    );

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = rolling::daily(dir, "contactbridge.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(None)
        }
    }
}
