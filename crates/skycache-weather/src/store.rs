//! Cache store: at most one persisted weather record, with change
//! notification for reactive reads.
//!
//! The store keeps a version counter in a `tokio::sync::watch` channel and
//! bumps it on every committed write, so observers re-read the record
//! without polling. Writers are serialized by the connection mutex; the
//! repository layers no lock of its own on top.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tokio::sync::watch;

use crate::error::StoreError;
use crate::types::RawWeather;

/// Reactive single-record store for the raw weather cache.
pub trait CacheStore: Send + Sync {
    /// Read the current record, if any.
    fn load(&self) -> Result<Option<RawWeather>, StoreError>;

    /// Atomically replace the store contents with the given record.
    fn replace_all(&self, record: &RawWeather) -> Result<(), StoreError>;

    /// Remove the record.
    fn clear(&self) -> Result<(), StoreError>;

    /// Subscribe to the version counter; it changes after every committed
    /// write, including `clear`.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// SQLite-backed cache store.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
    version: watch::Sender<u64>,
}

impl SqliteCacheStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            version: watch::channel(0).0,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            version: watch::channel(0).0,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS current_weather (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                record TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

impl CacheStore for SqliteCacheStore {
    fn load(&self) -> Result<Option<RawWeather>, StoreError> {
        let json: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT record FROM current_weather WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            None => Ok(None),
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        }
    }

    fn replace_all(&self, record: &RawWeather) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO current_weather (id, record) VALUES (1, ?1)",
            params![json],
        )?;
        tracing::debug!(location = %record.location_name, "replaced cached weather record");
        self.bump_version();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM current_weather", [])?;
        self.bump_version();
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

/// In-memory cache store. Same notification semantics as the SQLite store;
/// useful for consumers that do not want persistence, and for tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    record: Mutex<Option<RawWeather>>,
    version: watch::Sender<u64>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Result<Option<RawWeather>, StoreError> {
        Ok(self.record.lock().clone())
    }

    fn replace_all(&self, record: &RawWeather) -> Result<(), StoreError> {
        *self.record.lock() = Some(record.clone());
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.record.lock() = None;
        self.version.send_modify(|v| *v = v.wrapping_add(1));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
