//! The envelope wrapping every cached value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload together with the moment it was captured.
///
/// `captured_at` is stamped once at construction and never mutated; a
/// later write for the same key replaces the whole envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
  pub captured_at: DateTime<Utc>,
}

impl<T> Envelope<T> {
  /// Wrap a payload, stamping it with the current time.
  pub fn new(data: T) -> Self {
    Self {
      data,
      captured_at: Utc::now(),
    }
  }

  /// How long ago this envelope was captured.
  pub fn age(&self) -> Duration {
    Utc::now() - self.captured_at
  }

  /// Whether this envelope is older than `max_age`.
  ///
  /// Strict comparison: an envelope of exactly `max_age` is not expired.
  pub fn is_expired(&self, max_age: Duration) -> bool {
    self.age() > max_age
  }
}
