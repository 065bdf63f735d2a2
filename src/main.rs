mod api;
mod cache;
mod config;
mod net;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use api::{CachedClient, FetchResult, RestaurantFilters};
use net::{NetworkMonitor, StatusBanner};

#[derive(Parser, Debug)]
#[command(name = "tastebud")]
#[command(about = "Offline-capable client for the Tastebud food-discovery API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tastebud/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List restaurants
  Restaurants {
    /// Only this category, e.g. "ramen"
    #[arg(long)]
    category: Option<String>,
    /// Free-text search over name and description
    #[arg(long)]
    search: Option<String>,
  },
  /// Show one restaurant with its menu and reviews
  Restaurant { id: String },
  /// List menu items, optionally for one restaurant
  Menus {
    #[arg(long)]
    restaurant: Option<String>,
  },
  /// Show one menu item
  Menu { id: String },
  /// List reviews, optionally filtered by restaurant and/or menu item
  Reviews {
    #[arg(long)]
    restaurant: Option<String>,
    #[arg(long)]
    menu: Option<String>,
  },
  /// Show a user's profile
  Profile { user_id: String },
  /// List a user's favorite restaurants
  Favorites { user_id: String },
  /// Show connectivity and cache diagnostics
  Status,
  /// Cache maintenance
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Delete every cached entry
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging()?;

  let config = config::Config::load(args.config.as_deref())?;
  let client = CachedClient::new(&config)?;

  // A one-shot CLI has no ambient connectivity events; fetch outcomes are
  // the monitor's event source. Assume online until a fetch says otherwise.
  let monitor = Arc::new(NetworkMonitor::new(true));
  let mut resync_rx = monitor.subscribe();
  let mut banner = StatusBanner::new(Arc::clone(&monitor));

  let outcome = run_command(args.command, &client, &monitor).await;

  if resync_rx.try_recv().is_ok() {
    banner.note_resync();
  }
  if let Some(b) = banner.current() {
    println!("[{}]", b.message());
  }

  outcome
}

/// Write logs to a rolling file so they never interleave with command
/// output on stdout. Filter via TASTEBUD_LOG (defaults to info).
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("tastebud")
    .join("logs");

  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let appender = tracing_appender::rolling::daily(log_dir, "tastebud.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("TASTEBUD_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

async fn run_command(
  command: Command,
  client: &CachedClient,
  monitor: &NetworkMonitor,
) -> Result<()> {
  match command {
    Command::Restaurants { category, search } => {
      let filters = RestaurantFilters { category, search };
      let result = track(monitor, client.get_restaurants(&filters).await)?;
      print_restaurants(&result.data);
    }

    Command::Restaurant { id } => {
      let restaurant = track(monitor, client.get_restaurant(&id).await)?;
      print_restaurants(std::slice::from_ref(&restaurant.data));

      // The detail view fans out; reviews can't fail, menus can
      let (menus, reviews) = futures::join!(
        client.get_menus(Some(id.as_str())),
        client.get_reviews(Some(id.as_str()), None)
      );

      let menus = track(monitor, menus)?;
      observe(monitor, &reviews);

      println!();
      print_menu_items(&menus.data);
      println!();
      print_reviews(&reviews.data);
    }

    Command::Menus { restaurant } => {
      let result = track(monitor, client.get_menus(restaurant.as_deref()).await)?;
      print_menu_items(&result.data);
    }

    Command::Menu { id } => {
      let result = track(monitor, client.get_menu(&id).await)?;
      print_menu_items(std::slice::from_ref(&result.data));
    }

    Command::Reviews { restaurant, menu } => {
      let result = client.get_reviews(restaurant.as_deref(), menu.as_deref()).await;
      observe(monitor, &result);
      print_reviews(&result.data);
    }

    Command::Profile { user_id } => {
      let result = track(monitor, client.get_profile(&user_id).await)?;
      let profile = &result.data;
      println!("{} <{}>", profile.display_name, profile.email);
      println!("member since {}", profile.joined_at);
    }

    Command::Favorites { user_id } => {
      let result = track(monitor, client.get_favorites(&user_id).await)?;
      for favorite in &result.data {
        println!(
          "{}  {}  (added {})",
          favorite.restaurant_id, favorite.restaurant_name, favorite.added_at
        );
      }
    }

    Command::Status => {
      println!("online: {}", monitor.is_online());
      println!("cached entries: {}", client.cache_entry_count().await);
      match client.last_sync().await {
        Some(at) => println!("last sync: {}", at.to_rfc3339()),
        None => println!("last sync: never"),
      }
    }

    Command::Cache {
      action: CacheAction::Clear,
    } => {
      client.clear_cache().await;
      println!("cache cleared");
    }
  }

  Ok(())
}

/// Feed a fetch outcome to the monitor and pass the result along.
///
/// With the network-first strategy, a cached or failed result always means
/// the live fetch failed.
fn track<T>(
  monitor: &NetworkMonitor,
  result: Result<FetchResult<T>>,
) -> Result<FetchResult<T>> {
  match &result {
    Ok(r) if !r.from_cache => monitor.set_online(),
    _ => monitor.set_offline(),
  }
  result
}

fn observe<T>(monitor: &NetworkMonitor, result: &FetchResult<T>) {
  if result.from_cache {
    monitor.set_offline();
  } else {
    monitor.set_online();
  }
}

fn print_restaurants(restaurants: &[api::Restaurant]) {
  for r in restaurants {
    let rating = r
      .rating
      .map(|v| format!("{:.1}", v))
      .unwrap_or_else(|| "-".to_string());
    println!(
      "{}  {}  ({})  rating {} ({} reviews)",
      r.id,
      r.name,
      r.category,
      rating,
      r.review_count.unwrap_or(0),
    );
    if let Some(address) = &r.address {
      println!("    {}", address);
    }
  }
}

fn print_menu_items(items: &[api::MenuItem]) {
  for item in items {
    println!(
      "{}  {}  ${:.2}",
      item.id,
      item.name,
      item.price_cents as f64 / 100.0
    );
    if let Some(description) = &item.description {
      println!("    {}", description);
    }
  }
}

fn print_reviews(reviews: &[api::Review]) {
  if reviews.is_empty() {
    println!("no reviews");
    return;
  }

  for review in reviews {
    println!("{}/5  {}  ({})", review.rating, review.author, review.created_at);
    if let Some(comment) = &review.comment {
      println!("    {}", comment);
    }
  }
}
