//! Key/value settings collaborator, used for the last-fetch timestamp.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::error::StoreError;

/// Persisted key/value timestamps.
pub trait Settings: Send + Sync {
    /// Read a timestamp. Absence means the key was never written.
    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Write a timestamp.
    fn put_timestamp(&self, key: &str, value: DateTime<Utc>) -> Result<(), StoreError>;
}

/// SQLite-backed settings (a `settings` K/V table, epoch milliseconds).
pub struct SqliteSettings {
    conn: Mutex<Connection>,
}

impl SqliteSettings {
    /// Open (or create) the settings table at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let settings = Self {
            conn: Mutex::new(conn),
        };
        settings.init_schema()?;
        Ok(settings)
    }

    /// Create in-memory settings (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let settings = Self {
            conn: Mutex::new(conn),
        };
        settings.init_schema()?;
        Ok(settings)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl Settings for SqliteSettings {
    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let millis: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to read setting {}: {}", key, e);
                None
            });
        millis.and_then(DateTime::from_timestamp_millis)
    }

    fn put_timestamp(&self, key: &str, value: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value.timestamp_millis()],
        )?;
        Ok(())
    }
}

/// In-memory settings, for consumers without persistence and for tests.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Settings for MemorySettings {
    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.values.lock().get(key).copied()
    }

    fn put_timestamp(&self, key: &str, value: DateTime<Utc>) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }
}
