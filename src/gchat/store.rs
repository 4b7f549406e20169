//! Namespaced key-value store for gchat state.
//!
//! Values are JSON documents addressed by `(collection, key)`. Writing a
//! JSON `null` removes the key, so a cleared transcript reads back as absent.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

/// Errors raised by a [`Store`].
#[derive(Debug)]
pub enum StoreError {
    /// The SQLite backend failed.
    Sqlite(rusqlite::Error),
    /// A stored value could not be (de)serialized.
    Json { key: String, source: serde_json::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "store error: {e}"),
            Self::Json { key, source } => write!(f, "bad value for '{key}': {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

/// Key-value persistence. No transactions, last write wins.
pub trait Store: Send + Sync {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`. `Value::Null` deletes the key.
    fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Read and deserialize a value, `None` when absent.
pub fn load<T: DeserializeOwned>(
    store: &dyn Store,
    collection: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(collection, key)? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Json { key: key.to_string(), source }),
    }
}

/// Serialize and write a value.
pub fn save<T: Serialize + ?Sized>(
    store: &dyn Store,
    collection: &str,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value)
        .map_err(|source| StoreError::Json { key: key.to_string(), source })?;
    store.set(collection, key, value)
}

/// SQLite-backed [`Store`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        info!("Opened store at {:?} ({} keys)", path, store.count()?);
        Ok(store)
    }

    /// Create a throwaway in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );
        "#,
        )?;
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl Store for SqliteStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|source| StoreError::Json { key: key.to_string(), source }),
        }
    }

    fn set(&self, collection: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store lock poisoned");
        if value.is_null() {
            debug!("store: delete {collection}/{key}");
            conn.execute(
                "DELETE FROM kv WHERE collection = ?1 AND key = ?2",
                params![collection, key],
            )?;
        } else {
            debug!("store: set {collection}/{key}");
            conn.execute(
                "INSERT INTO kv (collection, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(collection, key) DO UPDATE SET value = excluded.value",
                params![collection, key, value.to_string()],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get("custom.gchat", "nope").unwrap().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("c", "k", json!([1, 2])).unwrap();
        store.set("c", "k", json!([3])).unwrap();
        assert_eq!(store.get("c", "k").unwrap(), Some(json!([3])));
    }

    #[test]
    fn test_null_deletes() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("c", "k", json!("x")).unwrap();
        store.set("c", "k", Value::Null).unwrap();
        assert!(store.get("c", "k").unwrap().is_none());
    }

    #[test]
    fn test_collections_are_separate() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("a", "k", json!(1)).unwrap();
        assert!(store.get("b", "k").unwrap().is_none());
    }

    #[test]
    fn test_typed_helpers() {
        let store = SqliteStore::in_memory().unwrap();
        save(&store, "c", "lines", &vec!["a".to_string(), "b".to_string()]).unwrap();
        let lines: Option<Vec<String>> = load(&store, "c", "lines").unwrap();
        assert_eq!(lines, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_typed_load_wrong_shape() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("c", "flag", json!("not a bool")).unwrap();
        let err = load::<bool>(&store, "c", "flag").unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("flag"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gchat.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("custom.gchat", "gchat_for_all", json!(true)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("custom.gchat", "gchat_for_all").unwrap(), Some(json!(true)));
    }
}
