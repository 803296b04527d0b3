//! Application layer for wikiedit.
//!
//! Hosts the editing-session controller and the pieces it coordinates:
//! the prepared cache-key broker, history synchronisation and the desktop
//! and mobile presentations.

#[macro_use]
mod tracking;

pub mod cache_key_broker;
pub mod controller;
pub mod history_sync;
pub mod presentation;

pub use cache_key_broker::CacheKeyBroker;
pub use controller::{EditSessionController, SaveOutcome};
pub use history_sync::{HistorySyncAdapter, NavigationIntent};
pub use presentation::{DesktopPresentation, MobilePresentation, SaveDialogModel};
