//! Infrastructure layer for wikiedit.
//!
//! Configuration loading and the in-memory host adapters used by headless
//! sessions and tests.

pub mod config_service;
pub mod memory_history;
pub mod memory_page_view;
pub mod paths;
pub mod static_host;

pub use config_service::ConfigService;
pub use memory_history::{HistoryEntry, MemoryHistory};
pub use memory_page_view::{MemoryPageView, Submission};
pub use paths::WikieditPaths;
pub use static_host::StaticHost;
