//! Connectivity tracking and the status banner it drives.

mod monitor;
mod status;

pub use monitor::{NetworkMonitor, ResyncSignal};
pub use status::{Banner, StatusBanner};
