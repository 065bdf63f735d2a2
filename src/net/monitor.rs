//! Single source of truth for connectivity state.

use std::sync::Mutex;
use tokio::sync::broadcast;

/// Broadcast payload emitted once per offline-to-online recovery.
///
/// Subscribers are expected to re-fetch primary data; delivery is
/// fire-and-forget and subscribers must be idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncSignal;

#[derive(Debug)]
struct MonitorState {
  online: bool,
  was_offline: bool,
}

/// Tracks whether the app currently has connectivity and notifies
/// subscribers when it comes back after being lost.
///
/// Explicitly constructed and owned by the app (no module-level global);
/// state changes only through the two transition handlers. Repeated
/// identical signals are no-ops on state.
pub struct NetworkMonitor {
  state: Mutex<MonitorState>,
  resync_tx: broadcast::Sender<ResyncSignal>,
}

impl NetworkMonitor {
  /// Create a monitor seeded with the platform's current connectivity flag.
  pub fn new(initially_online: bool) -> Self {
    let (resync_tx, _) = broadcast::channel(8);

    Self {
      state: Mutex::new(MonitorState {
        online: initially_online,
        was_offline: false,
      }),
      resync_tx,
    }
  }

  /// Handle a went-offline signal.
  pub fn set_offline(&self) {
    let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    state.online = false;
    state.was_offline = true;
  }

  /// Handle a came-back-online signal.
  ///
  /// If connectivity had been lost since the last recovery, broadcasts a
  /// single [`ResyncSignal`] and clears the pending-recovery flag.
  pub fn set_online(&self) {
    let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    state.online = true;

    if state.was_offline {
      state.was_offline = false;
      // No subscribers is fine; the signal is fire-and-forget
      let _ = self.resync_tx.send(ResyncSignal);
    }
  }

  /// Instantaneous connectivity snapshot.
  pub fn is_online(&self) -> bool {
    self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).online
  }

  /// Whether connectivity was lost and has not yet been recovered from.
  pub fn was_offline(&self) -> bool {
    self
      .state
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
      .was_offline
  }

  /// Subscribe to resync notifications.
  pub fn subscribe(&self) -> broadcast::Receiver<ResyncSignal> {
    self.resync_tx.subscribe()
  }
}
