pub mod config;
pub mod document;
pub mod error;
pub mod history;
pub mod host;
pub mod page_view;
pub mod presentation;
pub mod remote;
pub mod save;
pub mod session;

// Re-export common error type
pub use error::{EditError, Result};

/// `tracing` target of analytics events.
pub const TRACK_TARGET: &str = "wikiedit::track";
