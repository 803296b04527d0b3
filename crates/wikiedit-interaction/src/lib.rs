//! HTTP implementation of the remote edit API.
//!
//! [`MediaWikiEditClient`] speaks the `visualeditor` / `visualeditoredit`
//! actions of a MediaWiki `api.php` endpoint.

pub mod client;
mod wire;

pub use client::MediaWikiEditClient;
