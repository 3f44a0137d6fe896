//! SQLite-backed contact store
//!
//! Scalar name fields live in their own columns; phone numbers, email
//! addresses, and the extended pass-through fields are stored as JSON text.
//! Name matching and record resolution run in Rust over the loaded rows.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::{Map, Value};

use crate::contact::{self, Contact, ExtraProperty};
use crate::traits::{ContactQuery, ContactStore, StoreError, WriteOp};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS contacts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        identifier TEXT NOT NULL UNIQUE,
        first_name TEXT,
        last_name TEXT,
        nickname TEXT,
        birthday TEXT,
        phone_numbers TEXT NOT NULL DEFAULT '[]',
        email_addresses TEXT NOT NULL DEFAULT '[]',
        extended TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );";

const SELECT_ALL: &str = "SELECT identifier, first_name, last_name, nickname, birthday,
            phone_numbers, email_addresses, extended
     FROM contacts
     ORDER BY seq ASC";

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageError(e.to_string())
}

pub struct SqliteContactStore {
    conn: Mutex<Connection>,
}

impl SqliteContactStore {
    /// Open or create a contacts database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        tracing::info!(path = %path.display(), "Opened contacts database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_all(conn: &Connection) -> Result<Vec<Contact>, StoreError> {
        let mut stmt = conn.prepare(SELECT_ALL).map_err(db_err)?;
        let contacts = stmt
            .query_map([], row_to_contact)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(contacts)
    }

    fn insert(conn: &Connection, contact: &Contact) -> Result<String, StoreError> {
        let identifier = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO contacts (identifier, first_name, last_name, nickname, birthday,
                                   phone_numbers, email_addresses, extended, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                identifier,
                contact.first_name,
                contact.last_name,
                contact.nickname,
                contact.birthday,
                to_json(&contact.phone_numbers)?,
                to_json(&contact.email_addresses)?,
                to_json(&extended_map(contact))?,
                now,
            ],
        )
        .map_err(db_err)?;
        Ok(identifier)
    }

    fn replace(conn: &Connection, contact: &Contact) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "UPDATE contacts
             SET first_name = ?2, last_name = ?3, nickname = ?4, birthday = ?5,
                 phone_numbers = ?6, email_addresses = ?7, extended = ?8, updated_at = ?9
             WHERE identifier = ?1",
            params![
                contact.identifier,
                contact.first_name,
                contact.last_name,
                contact.nickname,
                contact.birthday,
                to_json(&contact.phone_numbers)?,
                to_json(&contact.email_addresses)?,
                to_json(&extended_map(contact))?,
                now,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(db_err)
}

fn extended_map(contact: &Contact) -> Map<String, Value> {
    ExtraProperty::ALL
        .iter()
        .filter_map(|p| contact.extra(*p).map(|v| (p.as_str().to_string(), v.clone())))
        .collect()
}

/// Decode a JSON text column. A damaged value fails the row rather than
/// reading as empty, so a later update can't overwrite it.
fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    let mut contact = Contact {
        identifier: Some(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        nickname: row.get(3)?,
        birthday: row.get(4)?,
        phone_numbers: json_column(row, 5)?,
        email_addresses: json_column(row, 6)?,
        ..Default::default()
    };

    let extended: Map<String, Value> = json_column(row, 7)?;
    for (key, value) in extended {
        if let Ok(property) = key.parse::<ExtraProperty>() {
            contact.set_extra(property, Some(value));
        }
    }
    Ok(contact)
}

impl ContactStore for SqliteContactStore {
    fn read(
        &self,
        query: &ContactQuery,
        extra: &[ExtraProperty],
    ) -> Result<Vec<Contact>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let contacts = Self::load_all(&conn)?;
        Ok(contacts
            .iter()
            .filter(|c| match query {
                ContactQuery::All => true,
                ContactQuery::ByName(name) => c.matches_name(name),
            })
            .map(|c| c.project(extra))
            .collect())
    }

    fn write(&self, op: WriteOp) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let committed = match op {
            WriteOp::Add(new_contact) => {
                let identifier = Self::insert(&tx, &new_contact)?;
                tracing::debug!(identifier = %identifier, "Inserted contact");
                true
            }
            WriteOp::Update(update) => {
                let mut contacts = Self::load_all(&tx)?;
                let index = contact::position_for_update(&contacts, &update)
                    .ok_or_else(|| StoreError::NotFound(update.describe_target()))?;
                contacts[index].apply_update(&update);
                Self::replace(&tx, &contacts[index])?;
                tracing::debug!(identifier = ?contacts[index].identifier, "Updated contact");
                true
            }
            WriteOp::Delete(selector) => {
                let contacts = Self::load_all(&tx)?;
                match contact::position_for_selector(&contacts, &selector) {
                    Some(index) => {
                        tx.execute(
                            "DELETE FROM contacts WHERE identifier = ?1",
                            params![contacts[index].identifier],
                        )
                        .map_err(db_err)?;
                        tracing::debug!(
                            identifier = ?contacts[index].identifier,
                            "Deleted contact"
                        );
                        true
                    }
                    None => false,
                }
            }
        };

        tx.commit().map_err(db_err)?;
        Ok(committed)
    }
}
