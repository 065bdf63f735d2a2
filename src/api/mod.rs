//! The Tastebud API: domain types, live client, and the caching wrapper.

mod cached_client;
mod client;
mod keys;
mod types;

pub use cached_client::{CachedClient, FetchResult, NoCachedData};
pub use client::{ApiClient, RemoteSource};
pub use types::{Favorite, MenuItem, Restaurant, RestaurantFilters, Review, UserProfile};
