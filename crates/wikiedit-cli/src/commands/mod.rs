pub mod config;
pub mod edit;
mod session;
