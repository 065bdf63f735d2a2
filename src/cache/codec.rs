//! Envelope codec: the authoritative expiry policy.
//!
//! This is the only layer that understands the [`Envelope`] shape, and the
//! only place store failures are absorbed: reads degrade to misses, writes
//! to no-ops, with a warning in the log. Nothing below the fetcher ever
//! surfaces a storage error to a caller.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::envelope::Envelope;
use super::store::KvStore;

/// Reserved key for the last successful synchronization timestamp.
const LAST_SYNC_KEY: &str = "last_sync";

/// Reads and writes envelopes through a [`KvStore`], enforcing expiry at
/// read time. Expired entries are removed on the read that discovers them;
/// there is no background eviction.
#[derive(Clone)]
pub struct CacheCodec {
  store: Arc<dyn KvStore>,
}

impl CacheCodec {
  pub fn new(store: Arc<dyn KvStore>) -> Self {
    Self { store }
  }

  /// Wrap `data` in an envelope stamped now and persist it under `key`.
  ///
  /// Replaces any previous envelope for the key. Store failures are logged
  /// and swallowed.
  pub async fn save<T: Serialize>(&self, key: &str, data: &T) {
    let envelope = Envelope::new(data);

    let bytes = match serde_json::to_vec(&envelope) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(key, error = %e, "failed to serialize cache envelope");
        return;
      }
    };

    if let Err(e) = self.store.set(key, &bytes).await {
      warn!(key, error = %e, "failed to write cache entry");
    }
  }

  /// Read the envelope for `key` and return its payload.
  ///
  /// Returns `None` if the key is absent, the stored envelope cannot be
  /// decoded, or - when `max_age` is given - the entry is older than
  /// `max_age` (strictly; an entry of exactly `max_age` still counts as
  /// fresh). Expired entries are deleted before returning `None`.
  ///
  /// With `max_age` of `None` the entry is returned regardless of age.
  /// That is the explicit any-age policy for last-resort reads; callers
  /// that want bounded staleness must pass a window.
  pub async fn load<T: DeserializeOwned>(&self, key: &str, max_age: Option<Duration>) -> Option<T> {
    let bytes = match self.store.get(key).await {
      Ok(Some(bytes)) => bytes,
      Ok(None) => return None,
      Err(e) => {
        warn!(key, error = %e, "failed to read cache entry");
        return None;
      }
    };

    let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
      Ok(envelope) => envelope,
      Err(e) => {
        warn!(key, error = %e, "discarding undecodable cache entry");
        self.remove(key).await;
        return None;
      }
    };

    if let Some(max_age) = max_age {
      if envelope.is_expired(max_age) {
        self.remove(key).await;
        return None;
      }
    }

    Some(envelope.data)
  }

  /// Delete the entry for `key`. Absent keys and store failures are fine.
  pub async fn remove(&self, key: &str) {
    if let Err(e) = self.store.remove(key).await {
      warn!(key, error = %e, "failed to remove cache entry");
    }
  }

  /// Delete every cached entry, including the last-sync marker.
  pub async fn clear_all(&self) {
    if let Err(e) = self.store.clear().await {
      warn!(error = %e, "failed to clear cache");
    }
  }

  /// Number of stored entries. Diagnostic only.
  pub async fn entry_count(&self) -> usize {
    match self.store.keys().await {
      Ok(keys) => keys.len(),
      Err(e) => {
        warn!(error = %e, "failed to count cache entries");
        0
      }
    }
  }

  /// Record now as the moment of the last successful sync.
  pub async fn touch_last_sync(&self) {
    self.save(LAST_SYNC_KEY, &Utc::now()).await;
  }

  /// The moment of the last successful sync, if any. No expiry applies.
  pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
    self.load(LAST_SYNC_KEY, None).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::store::MemoryStore;
  use async_trait::async_trait;
  use color_eyre::{eyre::eyre, Result};
  use std::time::Duration as StdDuration;

  fn codec() -> CacheCodec {
    CacheCodec::new(Arc::new(MemoryStore::new()))
  }

  #[tokio::test]
  async fn round_trip() {
    let codec = codec();

    codec.save("restaurants", &vec!["sushi", "ramen"]).await;
    let loaded: Option<Vec<String>> = codec.load("restaurants", None).await;

    assert_eq!(loaded, Some(vec!["sushi".to_string(), "ramen".to_string()]));
  }

  #[tokio::test]
  async fn missing_key_is_none() {
    let codec = codec();

    let loaded: Option<String> = codec.load("never-written", None).await;
    assert_eq!(loaded, None);

    let loaded: Option<String> = codec.load("never-written", Some(Duration::minutes(5))).await;
    assert_eq!(loaded, None);
  }

  #[tokio::test]
  async fn fresh_entry_survives_max_age() {
    let codec = codec();

    codec.save("k", &7u32).await;
    let loaded: Option<u32> = codec.load("k", Some(Duration::minutes(5))).await;

    assert_eq!(loaded, Some(7));
  }

  #[tokio::test]
  async fn expired_entry_is_removed_on_read() {
    let codec = codec();

    codec.save("k", &7u32).await;
    tokio::time::sleep(StdDuration::from_millis(30)).await;

    let loaded: Option<u32> = codec.load("k", Some(Duration::milliseconds(5))).await;
    assert_eq!(loaded, None);

    // The read evicted the entry
    assert_eq!(codec.entry_count().await, 0);

    // A second read is an uneventful miss
    let loaded: Option<u32> = codec.load("k", Some(Duration::milliseconds(5))).await;
    assert_eq!(loaded, None);
  }

  #[tokio::test]
  async fn no_max_age_returns_stale_entries() {
    let codec = codec();

    codec.save("k", &7u32).await;
    tokio::time::sleep(StdDuration::from_millis(30)).await;

    // Too old for a 5ms window, but the any-age read still serves it
    let loaded: Option<u32> = codec.load("k", None).await;
    assert_eq!(loaded, Some(7));
  }

  #[tokio::test]
  async fn save_replaces_prior_envelope() {
    let codec = codec();

    codec.save("k", &1u32).await;
    codec.save("k", &2u32).await;

    let loaded: Option<u32> = codec.load("k", None).await;
    assert_eq!(loaded, Some(2));
    assert_eq!(codec.entry_count().await, 1);
  }

  #[tokio::test]
  async fn clear_all_empties_the_store() {
    let codec = codec();

    codec.save("a", &1u32).await;
    codec.save("b", &2u32).await;
    codec.clear_all().await;

    assert_eq!(codec.entry_count().await, 0);
  }

  #[tokio::test]
  async fn last_sync_round_trip() {
    let codec = codec();

    assert_eq!(codec.last_sync().await, None);

    let before = Utc::now();
    codec.touch_last_sync().await;
    let last = codec.last_sync().await.unwrap();

    assert!(last >= before);
    assert!(last <= Utc::now());
  }

  #[tokio::test]
  async fn undecodable_entry_is_a_miss() {
    let store = Arc::new(MemoryStore::new());
    store.set("k", b"not json").await.unwrap();

    let codec = CacheCodec::new(store);
    let loaded: Option<u32> = codec.load("k", None).await;

    assert_eq!(loaded, None);
    assert_eq!(codec.entry_count().await, 0);
  }

  /// Store whose every operation fails, for the soft-failure contract.
  struct FailingStore;

  #[async_trait]
  impl KvStore for FailingStore {
    async fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
      Err(eyre!("disk on fire"))
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
      Err(eyre!("disk on fire"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
      Err(eyre!("disk on fire"))
    }

    async fn clear(&self) -> Result<()> {
      Err(eyre!("disk on fire"))
    }

    async fn keys(&self) -> Result<Vec<String>> {
      Err(eyre!("disk on fire"))
    }
  }

  #[tokio::test]
  async fn store_failures_never_escape() {
    let codec = CacheCodec::new(Arc::new(FailingStore));

    codec.save("k", &1u32).await;
    let loaded: Option<u32> = codec.load("k", Some(Duration::minutes(5))).await;

    assert_eq!(loaded, None);
    assert_eq!(codec.entry_count().await, 0);
    codec.clear_all().await;
  }
}
