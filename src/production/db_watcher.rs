//! Filesystem change source for the contacts database
//!
//! Watches the directory holding the database so writes from any process
//! (including this one) are observed. One debounced batch touching the
//! database, its WAL, or its journal produces one notification, so writes
//! closer together than the debounce window are reported once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};

use crate::traits::{ChangeHandler, ChangeSource, ChangeSourceError, SubscriptionHandle};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct DbFileChangeSource {
    db_path: PathBuf,
    debounce: Duration,
    next_id: AtomicU64,
    subscriptions: Mutex<HashMap<u64, Debouncer<RecommendedWatcher, RecommendedCache>>>,
}

impl DbFileChangeSource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self::with_debounce(db_path, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(db_path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            db_path: db_path.into(),
            debounce,
            next_id: AtomicU64::new(0),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    fn watch_dir(&self) -> PathBuf {
        match self.db_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// True for the database file itself and its `-wal`, `-shm`, `-journal` siblings
fn is_store_file(db_name: &str, path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(db_name))
        .unwrap_or(false)
}

fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

impl ChangeSource for DbFileChangeSource {
    fn subscribe(&self, handler: ChangeHandler) -> Result<SubscriptionHandle, ChangeSourceError> {
        let dir = self.watch_dir();
        if !dir.exists() {
            return Err(ChangeSourceError::SubscribeError(format!(
                "Path not found: {}",
                dir.display()
            )));
        }
        let db_name = self
            .db_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ChangeSourceError::SubscribeError(format!(
                    "Not a database file: {}",
                    self.db_path.display()
                ))
            })?;

        let mut debouncer = new_debouncer(self.debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        is_write(&event.kind)
                            && event.paths.iter().any(|p| is_store_file(&db_name, p))
                    });
                    if touched {
                        tracing::debug!(events = events.len(), "Contacts database changed");
                        handler();
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::error!("Watch error: {:?}", error);
                    }
                }
            }
        })
        .map_err(|e| ChangeSourceError::SubscribeError(e.to_string()))?;

        debouncer
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| ChangeSourceError::SubscribeError(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscriptions.lock().unwrap().insert(id, debouncer);
        tracing::info!(path = %dir.display(), subscription = id, "Watching contacts database");
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChangeSourceError> {
        let debouncer = self
            .subscriptions
            .lock()
            .unwrap()
            .remove(&handle.0)
            .ok_or(ChangeSourceError::UnknownSubscription(handle.0))?;
        // Dropping the debouncer stops its watcher and worker thread
        drop(debouncer);
        tracing::info!(subscription = handle.0, "Unwatched contacts database");
        Ok(())
    }
}
