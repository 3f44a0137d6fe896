//! Production implementations of traits

mod authorization;
mod db_watcher;
mod sqlite_store;

pub use authorization::StoredAuthorization;
pub use db_watcher::DbFileChangeSource;
pub use sqlite_store::SqliteContactStore;
