//! The live Tastebud API client.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::Config;

use super::types::{Favorite, MenuItem, Restaurant, RestaurantFilters, Review, UserProfile};

/// Remote data source behind the cache layer.
///
/// Errors are opaque to callers: a timeout, a refused connection and a 5xx
/// all look the same, and all of them send the fetcher down the cache
/// fallback path.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  async fn fetch_restaurants(&self, filters: &RestaurantFilters) -> Result<Vec<Restaurant>>;

  async fn fetch_restaurant(&self, id: &str) -> Result<Restaurant>;

  async fn fetch_menus(&self, restaurant_id: Option<&str>) -> Result<Vec<MenuItem>>;

  async fn fetch_menu(&self, id: &str) -> Result<MenuItem>;

  async fn fetch_reviews(
    &self,
    restaurant_id: Option<&str>,
    menu_item_id: Option<&str>,
  ) -> Result<Vec<Review>>;

  async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile>;

  async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<Favorite>>;
}

/// HTTP client for the hosted Tastebud API.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut base_url = Url::parse(&config.api.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.api.base_url, e))?;

    // Url::join treats the last path segment as a file unless it ends in '/'
    if !base_url.path().ends_with('/') {
      base_url.set_path(&format!("{}/", base_url.path()));
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint path {}: {}", path, e))
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }
}

#[async_trait]
impl RemoteSource for ApiClient {
  async fn fetch_restaurants(&self, filters: &RestaurantFilters) -> Result<Vec<Restaurant>> {
    let mut url = self.endpoint("restaurants")?;

    {
      let mut pairs = url.query_pairs_mut();
      if let Some(category) = &filters.category {
        pairs.append_pair("category", category);
      }
      if let Some(search) = &filters.search {
        pairs.append_pair("search", search);
      }
    }

    self.get_json(url).await
  }

  async fn fetch_restaurant(&self, id: &str) -> Result<Restaurant> {
    let url = self.endpoint(&format!("restaurants/{}", id))?;
    self.get_json(url).await
  }

  async fn fetch_menus(&self, restaurant_id: Option<&str>) -> Result<Vec<MenuItem>> {
    let mut url = self.endpoint("menus")?;

    if let Some(restaurant_id) = restaurant_id {
      url
        .query_pairs_mut()
        .append_pair("restaurant_id", restaurant_id);
    }

    self.get_json(url).await
  }

  async fn fetch_menu(&self, id: &str) -> Result<MenuItem> {
    let url = self.endpoint(&format!("menus/{}", id))?;
    self.get_json(url).await
  }

  async fn fetch_reviews(
    &self,
    restaurant_id: Option<&str>,
    menu_item_id: Option<&str>,
  ) -> Result<Vec<Review>> {
    let mut url = self.endpoint("reviews")?;

    {
      let mut pairs = url.query_pairs_mut();
      if let Some(restaurant_id) = restaurant_id {
        pairs.append_pair("restaurant_id", restaurant_id);
      }
      if let Some(menu_item_id) = menu_item_id {
        pairs.append_pair("menu_item_id", menu_item_id);
      }
    }

    self.get_json(url).await
  }

  async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile> {
    let url = self.endpoint(&format!("users/{}", user_id))?;
    self.get_json(url).await
  }

  async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<Favorite>> {
    let url = self.endpoint(&format!("users/{}/favorites", user_id))?;
    self.get_json(url).await
  }
}
