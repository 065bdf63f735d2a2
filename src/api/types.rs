//! Domain records returned by the Tastebud API.

use serde::{Deserialize, Serialize};

/// A restaurant listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
  pub id: String,
  pub name: String,
  pub category: String,
  pub address: Option<String>,
  pub rating: Option<f64>,
  pub review_count: Option<u32>,
}

/// A single item on a restaurant's menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
  pub id: String,
  pub restaurant_id: String,
  pub name: String,
  pub description: Option<String>,
  /// Price in the smallest currency unit
  pub price_cents: u32,
  pub category: Option<String>,
}

/// A review left for a restaurant or a specific menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub id: String,
  pub restaurant_id: String,
  pub menu_item_id: Option<String>,
  pub author: String,
  /// 1-5 stars
  pub rating: u8,
  pub comment: Option<String>,
  pub created_at: String,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: String,
  pub display_name: String,
  pub email: String,
  pub joined_at: String,
}

/// A restaurant the user has favorited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
  pub restaurant_id: String,
  pub restaurant_name: String,
  pub added_at: String,
}

/// Server-side filters for restaurant listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantFilters {
  /// Exact category, e.g. "ramen"
  pub category: Option<String>,
  /// Free-text search over name and description
  pub search: Option<String>,
}

impl RestaurantFilters {
  pub fn is_empty(&self) -> bool {
    self.category.is_none() && self.search.is_none()
  }
}
