//! Cache-aware client: live fetch with cache fallback.
//!
//! Every operation tries the network first. A success is written through
//! to the cache and returned as live data; any failure - timeout, refused
//! connection, server error - falls back to the cache under one of two
//! policies:
//!
//! - primary resources (restaurants, menus, profile, favorites) accept
//!   cached data only within the freshness window and otherwise fail with
//!   [`NoCachedData`], so the UI can show a real error state;
//! - supplementary resources (reviews) accept cached data of any age and
//!   degrade to an empty list, since missing reviews are a harmless
//!   default.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::cache::{CacheCodec, KvStore, MemoryStore, NoopStore, SqliteStore};
use crate::config::Config;

use super::client::{ApiClient, RemoteSource};
use super::keys::QueryKey;
use super::types::{Favorite, MenuItem, Restaurant, RestaurantFilters, Review, UserProfile};

/// A resource payload plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
  pub data: T,
  /// True iff the value did not come from a successful live fetch in this
  /// call. Live values have already been persisted under their key.
  pub from_cache: bool,
}

impl<T> FetchResult<T> {
  fn live(data: T) -> Self {
    Self {
      data,
      from_cache: false,
    }
  }

  fn cached(data: T) -> Self {
    Self {
      data,
      from_cache: true,
    }
  }
}

/// The live fetch failed and no acceptable cached value exists.
///
/// The only error this layer surfaces; everything else is absorbed into
/// the fallback path.
#[derive(Debug, Clone)]
pub struct NoCachedData {
  query: String,
}

impl NoCachedData {
  fn new(query: String) -> Self {
    Self { query }
  }
}

impl std::fmt::Display for NoCachedData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "no cached data available for {}", self.query)
  }
}

impl std::error::Error for NoCachedData {}

/// Tastebud client with transparent caching and offline fallback.
#[derive(Clone)]
pub struct CachedClient {
  remote: Arc<dyn RemoteSource>,
  codec: CacheCodec,
  /// How long a cached value may satisfy a fallback read for primary
  /// resources
  freshness_window: Duration,
}

impl CachedClient {
  /// Create a client backed by the durable cache.
  ///
  /// If the cache database cannot be opened the client degrades to an
  /// in-memory cache for this session rather than failing; if caching is
  /// disabled in the config, cache reads always miss.
  pub fn new(config: &Config) -> Result<Self> {
    let remote = ApiClient::new(config)?;

    let store: Arc<dyn KvStore> = if !config.cache.enabled {
      Arc::new(NoopStore)
    } else {
      match SqliteStore::open() {
        Ok(store) => Arc::new(store),
        Err(e) => {
          warn!(error = %e, "cache database unavailable, using in-memory cache");
          Arc::new(MemoryStore::new())
        }
      }
    };

    Ok(Self::assemble(Arc::new(remote), CacheCodec::new(store)))
  }

  fn assemble(remote: Arc<dyn RemoteSource>, codec: CacheCodec) -> Self {
    Self {
      remote,
      codec,
      freshness_window: Duration::minutes(5),
    }
  }

  /// Set the freshness window for fallback reads.
  #[allow(dead_code)]
  fn with_freshness_window(mut self, window: Duration) -> Self {
    self.freshness_window = window;
    self
  }

  /// Restaurant listing, optionally filtered by category and search text.
  pub async fn get_restaurants(
    &self,
    filters: &RestaurantFilters,
  ) -> Result<FetchResult<Vec<Restaurant>>> {
    let key = QueryKey::Restaurants {
      filters: filters.clone(),
    };
    let remote = Arc::clone(&self.remote);
    let filters = filters.clone();

    self
      .fetch_primary(key, || async move { remote.fetch_restaurants(&filters).await })
      .await
  }

  /// A single restaurant by id.
  pub async fn get_restaurant(&self, id: &str) -> Result<FetchResult<Restaurant>> {
    let key = QueryKey::Restaurant { id: id.to_string() };
    let remote = Arc::clone(&self.remote);
    let id = id.to_string();

    self
      .fetch_primary(key, || async move { remote.fetch_restaurant(&id).await })
      .await
  }

  /// Menu items, optionally limited to one restaurant.
  pub async fn get_menus(
    &self,
    restaurant_id: Option<&str>,
  ) -> Result<FetchResult<Vec<MenuItem>>> {
    let key = QueryKey::Menus {
      restaurant_id: restaurant_id.map(String::from),
    };
    let remote = Arc::clone(&self.remote);
    let restaurant_id = restaurant_id.map(String::from);

    self
      .fetch_primary(key, || async move {
        remote.fetch_menus(restaurant_id.as_deref()).await
      })
      .await
  }

  /// A single menu item by id.
  pub async fn get_menu(&self, id: &str) -> Result<FetchResult<MenuItem>> {
    let key = QueryKey::Menu { id: id.to_string() };
    let remote = Arc::clone(&self.remote);
    let id = id.to_string();

    self
      .fetch_primary(key, || async move { remote.fetch_menu(&id).await })
      .await
  }

  /// Reviews, optionally limited by restaurant and/or menu item.
  ///
  /// Never fails: with neither live nor cached data this returns an empty
  /// list marked as cached.
  pub async fn get_reviews(
    &self,
    restaurant_id: Option<&str>,
    menu_item_id: Option<&str>,
  ) -> FetchResult<Vec<Review>> {
    let key = QueryKey::Reviews {
      restaurant_id: restaurant_id.map(String::from),
      menu_item_id: menu_item_id.map(String::from),
    };
    let remote = Arc::clone(&self.remote);
    let restaurant_id = restaurant_id.map(String::from);
    let menu_item_id = menu_item_id.map(String::from);

    self
      .fetch_supplementary(key, || async move {
        remote
          .fetch_reviews(restaurant_id.as_deref(), menu_item_id.as_deref())
          .await
      })
      .await
  }

  /// The signed-in user's profile.
  pub async fn get_profile(&self, user_id: &str) -> Result<FetchResult<UserProfile>> {
    let key = QueryKey::Profile {
      user_id: user_id.to_string(),
    };
    let remote = Arc::clone(&self.remote);
    let user_id = user_id.to_string();

    self
      .fetch_primary(key, || async move { remote.fetch_profile(&user_id).await })
      .await
  }

  /// The user's favorited restaurants.
  pub async fn get_favorites(&self, user_id: &str) -> Result<FetchResult<Vec<Favorite>>> {
    let key = QueryKey::Favorites {
      user_id: user_id.to_string(),
    };
    let remote = Arc::clone(&self.remote);
    let user_id = user_id.to_string();

    self
      .fetch_primary(key, || async move { remote.fetch_favorites(&user_id).await })
      .await
  }

  /// Number of cached entries. Diagnostic only.
  pub async fn cache_entry_count(&self) -> usize {
    self.codec.entry_count().await
  }

  /// When the last successful live fetch happened, if ever.
  pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
    self.codec.last_sync().await
  }

  /// Drop every cached entry.
  pub async fn clear_cache(&self) {
    self.codec.clear_all().await;
  }

  /// Primary resolution: live fetch, write-through on success; on failure
  /// serve cache within the freshness window or fail with [`NoCachedData`].
  async fn fetch_primary<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<FetchResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let cache_key = key.cache_key();

    match fetcher().await {
      Ok(data) => {
        self.codec.save(&cache_key, &data).await;
        self.codec.touch_last_sync().await;
        Ok(FetchResult::live(data))
      }
      Err(e) => {
        warn!(query = %key.describe(), error = %e, "live fetch failed, falling back to cache");

        match self.codec.load(&cache_key, Some(self.freshness_window)).await {
          Some(data) => Ok(FetchResult::cached(data)),
          None => Err(NoCachedData::new(key.describe()).into()),
        }
      }
    }
  }

  /// Supplementary resolution: like primary, but the fallback accepts a
  /// cached value of any age and bottoms out at `T::default()` instead of
  /// an error.
  async fn fetch_supplementary<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> FetchResult<T>
  where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let cache_key = key.cache_key();

    match fetcher().await {
      Ok(data) => {
        self.codec.save(&cache_key, &data).await;
        self.codec.touch_last_sync().await;
        FetchResult::live(data)
      }
      Err(e) => {
        warn!(query = %key.describe(), error = %e, "live fetch failed, falling back to cache");

        match self.codec.load(&cache_key, None).await {
          Some(data) => FetchResult::cached(data),
          None => FetchResult::cached(T::default()),
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::time::Duration as StdDuration;

  fn restaurant(id: &str) -> Restaurant {
    Restaurant {
      id: id.to_string(),
      name: format!("Restaurant {}", id),
      category: "ramen".to_string(),
      address: None,
      rating: Some(4.5),
      review_count: Some(12),
    }
  }

  fn menu_item(id: &str, restaurant_id: &str) -> MenuItem {
    MenuItem {
      id: id.to_string(),
      restaurant_id: restaurant_id.to_string(),
      name: format!("Item {}", id),
      description: None,
      price_cents: 1250,
      category: None,
    }
  }

  fn review(id: &str, restaurant_id: &str) -> Review {
    Review {
      id: id.to_string(),
      restaurant_id: restaurant_id.to_string(),
      menu_item_id: None,
      author: "alice".to_string(),
      rating: 5,
      comment: Some("great broth".to_string()),
      created_at: "2024-03-01T12:00:00Z".to_string(),
    }
  }

  /// Remote whose failure mode can be toggled mid-test.
  struct MockRemote {
    failing: AtomicBool,
  }

  impl MockRemote {
    fn new() -> Arc<Self> {
      Arc::new(Self {
        failing: AtomicBool::new(false),
      })
    }

    fn go_offline(&self) {
      self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
      if self.failing.load(Ordering::SeqCst) {
        Err(eyre!("connection refused"))
      } else {
        Ok(())
      }
    }
  }

  #[async_trait]
  impl RemoteSource for MockRemote {
    async fn fetch_restaurants(&self, filters: &RestaurantFilters) -> Result<Vec<Restaurant>> {
      self.check()?;
      let _ = filters;
      Ok(vec![restaurant("R1"), restaurant("R2")])
    }

    async fn fetch_restaurant(&self, id: &str) -> Result<Restaurant> {
      self.check()?;
      Ok(restaurant(id))
    }

    async fn fetch_menus(&self, restaurant_id: Option<&str>) -> Result<Vec<MenuItem>> {
      self.check()?;
      Ok(vec![menu_item("M1", restaurant_id.unwrap_or("R1"))])
    }

    async fn fetch_menu(&self, id: &str) -> Result<MenuItem> {
      self.check()?;
      Ok(menu_item(id, "R1"))
    }

    async fn fetch_reviews(
      &self,
      restaurant_id: Option<&str>,
      _menu_item_id: Option<&str>,
    ) -> Result<Vec<Review>> {
      self.check()?;
      Ok(vec![review("V1", restaurant_id.unwrap_or("R1"))])
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile> {
      self.check()?;
      Ok(UserProfile {
        id: user_id.to_string(),
        display_name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        joined_at: "2023-01-01T00:00:00Z".to_string(),
      })
    }

    async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<Favorite>> {
      self.check()?;
      let _ = user_id;
      Ok(vec![Favorite {
        restaurant_id: "R1".to_string(),
        restaurant_name: "Restaurant R1".to_string(),
        added_at: "2024-01-01T00:00:00Z".to_string(),
      }])
    }
  }

  fn client(remote: Arc<MockRemote>) -> CachedClient {
    CachedClient::assemble(remote, CacheCodec::new(Arc::new(MemoryStore::new())))
  }

  #[tokio::test]
  async fn live_fetch_is_written_through_and_marked_live() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote));

    let result = client.get_restaurants(&RestaurantFilters::default()).await.unwrap();
    assert!(!result.from_cache);
    assert_eq!(result.data.len(), 2);

    // Same query served from cache once the network goes away
    remote.go_offline();
    let fallback = client.get_restaurants(&RestaurantFilters::default()).await.unwrap();
    assert!(fallback.from_cache);
    assert_eq!(fallback.data, result.data);
  }

  #[tokio::test]
  async fn cold_failure_surfaces_no_cached_data() {
    let remote = MockRemote::new();
    remote.go_offline();
    let client = client(remote);

    let err = client
      .get_restaurants(&RestaurantFilters::default())
      .await
      .unwrap_err();

    assert!(err.downcast_ref::<NoCachedData>().is_some());
  }

  #[tokio::test]
  async fn expired_cache_does_not_satisfy_primary_fallback() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote)).with_freshness_window(Duration::milliseconds(5));

    client.get_restaurants(&RestaurantFilters::default()).await.unwrap();

    tokio::time::sleep(StdDuration::from_millis(30)).await;
    remote.go_offline();

    let err = client
      .get_restaurants(&RestaurantFilters::default())
      .await
      .unwrap_err();
    assert!(err.downcast_ref::<NoCachedData>().is_some());
  }

  #[tokio::test]
  async fn different_filters_never_share_cache_entries() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote));

    // Populate only the unfiltered menu listing
    client.get_menus(None).await.unwrap();
    remote.go_offline();

    // The per-restaurant query has its own key and must not be satisfied
    let err = client.get_menus(Some("R1")).await.unwrap_err();
    assert!(err.downcast_ref::<NoCachedData>().is_some());

    // While the populated one still is
    let cached = client.get_menus(None).await.unwrap();
    assert!(cached.from_cache);
  }

  #[tokio::test]
  async fn by_id_lookups_cache_per_id() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote));

    client.get_restaurant("R1").await.unwrap();
    remote.go_offline();

    assert!(client.get_restaurant("R1").await.unwrap().from_cache);

    let err = client.get_restaurant("R2").await.unwrap_err();
    assert!(err.downcast_ref::<NoCachedData>().is_some());
  }

  #[tokio::test]
  async fn reviews_degrade_to_empty_list() {
    let remote = MockRemote::new();
    remote.go_offline();
    let client = client(remote);

    let result = client.get_reviews(Some("R1"), None).await;
    assert!(result.from_cache);
    assert!(result.data.is_empty());
  }

  #[tokio::test]
  async fn reviews_accept_stale_cache() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote)).with_freshness_window(Duration::milliseconds(5));

    let live = client.get_reviews(Some("R1"), None).await;
    assert!(!live.from_cache);

    // Old enough that a primary resource would refuse it
    tokio::time::sleep(StdDuration::from_millis(30)).await;
    remote.go_offline();

    let stale = client.get_reviews(Some("R1"), None).await;
    assert!(stale.from_cache);
    assert_eq!(stale.data, live.data);
  }

  #[tokio::test]
  async fn successful_fetch_touches_last_sync() {
    let remote = MockRemote::new();
    let client = client(remote);

    assert_eq!(client.last_sync().await, None);

    client.get_restaurant("R1").await.unwrap();
    assert!(client.last_sync().await.is_some());
  }

  #[tokio::test]
  async fn clear_cache_forgets_everything() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote));

    client.get_restaurant("R1").await.unwrap();
    assert!(client.cache_entry_count().await > 0);

    client.clear_cache().await;
    assert_eq!(client.cache_entry_count().await, 0);

    remote.go_offline();
    let err = client.get_restaurant("R1").await.unwrap_err();
    assert!(err.downcast_ref::<NoCachedData>().is_some());
  }

  #[tokio::test]
  async fn profile_and_favorites_follow_primary_policy() {
    let remote = MockRemote::new();
    let client = client(Arc::clone(&remote));

    client.get_profile("alice").await.unwrap();
    client.get_favorites("alice").await.unwrap();
    remote.go_offline();

    assert!(client.get_profile("alice").await.unwrap().from_cache);
    assert!(client.get_favorites("alice").await.unwrap().from_cache);

    let err = client.get_profile("bob").await.unwrap_err();
    assert!(err.downcast_ref::<NoCachedData>().is_some());
  }
}
