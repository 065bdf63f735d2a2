//! Cache key derivation for API queries.

use sha2::{Digest, Sha256};

use super::types::RestaurantFilters;

/// One variant per logical query the client can issue.
///
/// Two calls with identical parameters must hash to the same key, and any
/// differing filter must hash to a different one, so the cache can never
/// conflate results from different queries. By-id lookups are namespaced
/// apart from the collection queries for the same resource.
#[derive(Clone, Debug)]
pub enum QueryKey {
  /// Restaurant listing, optionally filtered
  Restaurants { filters: RestaurantFilters },
  /// A single restaurant by id
  Restaurant { id: String },
  /// Menu items, optionally limited to one restaurant
  Menus { restaurant_id: Option<String> },
  /// A single menu item by id
  Menu { id: String },
  /// Reviews, optionally limited by restaurant and/or menu item
  Reviews {
    restaurant_id: Option<String>,
    menu_item_id: Option<String>,
  },
  /// The signed-in user's profile
  Profile { user_id: String },
  /// The user's favorited restaurants
  Favorites { user_id: String },
}

impl QueryKey {
  /// Stable, fixed-length storage key: SHA256 over the canonical form.
  pub fn cache_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Canonical serialization of the query. Field order is fixed and
  /// free-text search is normalized, so logically identical queries
  /// always produce the same string.
  fn canonical(&self) -> String {
    match self {
      Self::Restaurants { filters } => format!(
        "restaurants:category={}:search={}",
        filters.category.as_deref().unwrap_or(""),
        filters.search.as_deref().map(normalize_search).unwrap_or_default(),
      ),
      Self::Restaurant { id } => format!("restaurant:{}", id),
      Self::Menus { restaurant_id } => {
        format!("menus:{}", restaurant_id.as_deref().unwrap_or(""))
      }
      Self::Menu { id } => format!("menu:{}", id),
      Self::Reviews {
        restaurant_id,
        menu_item_id,
      } => format!(
        "reviews:{}:{}",
        restaurant_id.as_deref().unwrap_or(""),
        menu_item_id.as_deref().unwrap_or(""),
      ),
      Self::Profile { user_id } => format!("profile:{}", user_id),
      Self::Favorites { user_id } => format!("favorites:{}", user_id),
    }
  }

  /// Human-readable description for logs.
  pub fn describe(&self) -> String {
    match self {
      Self::Restaurants { filters } if filters.is_empty() => "all restaurants".to_string(),
      Self::Restaurants { filters } => format!(
        "restaurants (category: {}, search: {})",
        filters.category.as_deref().unwrap_or("any"),
        filters.search.as_deref().unwrap_or("none"),
      ),
      Self::Restaurant { id } => format!("restaurant {}", id),
      Self::Menus { restaurant_id: Some(id) } => format!("menus of restaurant {}", id),
      Self::Menus { restaurant_id: None } => "all menus".to_string(),
      Self::Menu { id } => format!("menu item {}", id),
      Self::Reviews {
        restaurant_id,
        menu_item_id,
      } => format!(
        "reviews (restaurant: {}, menu item: {})",
        restaurant_id.as_deref().unwrap_or("any"),
        menu_item_id.as_deref().unwrap_or("any"),
      ),
      Self::Profile { user_id } => format!("profile of {}", user_id),
      Self::Favorites { user_id } => format!("favorites of {}", user_id),
    }
  }
}

/// Normalize free-text search for consistent hashing.
/// Trims whitespace and lowercases for case-insensitive matching.
fn normalize_search(search: &str) -> String {
  search.trim().to_lowercase()
}
