//! Connectivity banner shown above command output.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::monitor::NetworkMonitor;

/// How long the "back online" banner stays up after a recovery.
const RECONNECTED_DISPLAY: Duration = Duration::from_secs(3);

/// What the banner should currently say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
  /// Connectivity lost; results may come from the local cache.
  Offline,
  /// Connectivity just returned; data is being refreshed.
  Reconnecting,
}

impl Banner {
  pub fn message(&self) -> &'static str {
    match self {
      Banner::Offline => "offline, showing saved data",
      Banner::Reconnecting => "back online, syncing",
    }
  }
}

/// Maps monitor state to the banner, holding the transient "back online"
/// message for a short fixed window after each resync.
pub struct StatusBanner {
  monitor: Arc<NetworkMonitor>,
  reconnected_at: Option<Instant>,
  display_window: Duration,
}

impl StatusBanner {
  pub fn new(monitor: Arc<NetworkMonitor>) -> Self {
    Self {
      monitor,
      reconnected_at: None,
      display_window: RECONNECTED_DISPLAY,
    }
  }

  #[cfg(test)]
  fn with_display_window(mut self, window: Duration) -> Self {
    self.display_window = window;
    self
  }

  /// Record that a resync signal was observed.
  pub fn note_resync(&mut self) {
    self.reconnected_at = Some(Instant::now());
  }

  /// The banner to show right now, if any.
  pub fn current(&self) -> Option<Banner> {
    if !self.monitor.is_online() {
      return Some(Banner::Offline);
    }

    match self.reconnected_at {
      Some(at) if at.elapsed() < self.display_window => Some(Banner::Reconnecting),
      _ => None,
    }
  }
}
