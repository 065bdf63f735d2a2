//! Key-value store backends for the cache.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::Mutex;

/// Trait for durable key-value storage backends.
///
/// Values are opaque byte blobs; only the codec layer knows their shape.
/// All operations are async so callers may suspend, never block.
#[async_trait]
pub trait KvStore: Send + Sync {
  /// Store a value under `key`, replacing any previous value.
  async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

  /// Get the value stored under `key`, or `None` if absent.
  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Delete the entry for `key`. Succeeds silently if absent.
  async fn remove(&self, key: &str) -> Result<()>;

  /// Delete every entry in this store.
  async fn clear(&self) -> Result<()>;

  /// All currently stored keys. Used to report cache size, not for
  /// iteration-based logic.
  async fn keys(&self) -> Result<Vec<String>>;
}

/// Store that doesn't persist anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

#[async_trait]
impl KvStore for NoopStore {
  async fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  async fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

/// In-process store backed by a plain map.
///
/// Fallback when the durable store cannot be opened (locked-down profile,
/// read-only home) so the app keeps working for the session, and the
/// backend of choice in tests.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl KvStore for MemoryStore {
  async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_vec());
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.clear();
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.keys().cloned().collect())
  }
}

/// SQLite-backed durable store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open a store that lives only in memory. Useful for tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("tastebud").join("cache.db"))
  }

  /// Run database migrations for the cache table.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[async_trait]
impl KvStore for SqliteStore {
  async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (key, data, stored_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT data FROM kv_cache WHERE key = ?")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let result: Option<Vec<u8>> = stmt.query_row(params![key], |row| row.get(0)).ok();

    Ok(result)
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_cache WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cache entry: {}", e))?;

    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_cache", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT key FROM kv_cache")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let keys: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to query keys: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(keys)
  }
}
