//! Prepared-serialization cache keys.
//!
//! Uploading the HTML once ahead of a save or diff lets the later request send
//! a short key instead of the whole document. The broker remembers at most one
//! preparation, bound to the exact snapshot it was computed from.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wikiedit_core::document::{DocumentSnapshot, EditMode, SnapshotId};
use wikiedit_core::remote::{
    CacheKey, ContentPayload, PrepareRequest, RemoteEditClient, RemoteError, RemoteResult,
};
use wikiedit_core::session::RevisionTokens;

/// A cache-key preparation every caller for the same snapshot shares.
pub type PreparedKey = Shared<BoxFuture<'static, RemoteResult<CacheKey>>>;

struct Preparation {
    snapshot: SnapshotId,
    future: PreparedKey,
    abort: CancellationToken,
}

pub struct CacheKeyBroker {
    client: Arc<dyn RemoteEditClient>,
    current: RwLock<Option<Preparation>>,
}

impl CacheKeyBroker {
    pub fn new(client: Arc<dyn RemoteEditClient>) -> Self {
        Self {
            client,
            current: RwLock::new(None),
        }
    }

    /// Returns the preparation for `snapshot`, starting one if needed.
    ///
    /// The same snapshot always yields the same shared future, pending or
    /// completed. A different snapshot aborts and replaces the previous one.
    /// Source-mode documents are sent as wikitext and never prepared.
    pub async fn prepare(
        &self,
        snapshot: &DocumentSnapshot,
        page: &str,
        tokens: &RevisionTokens,
        edit_token: Option<&str>,
    ) -> Option<PreparedKey> {
        if snapshot.mode == EditMode::Source {
            return None;
        }

        let mut current = self.current.write().await;
        if let Some(existing) = current.as_ref().filter(|p| p.snapshot == snapshot.id) {
            return Some(existing.future.clone());
        }
        if let Some(stale) = current.take() {
            stale.abort.cancel();
        }

        let abort = CancellationToken::new();
        let request = PrepareRequest {
            page: page.to_string(),
            html: Arc::clone(&snapshot.content),
            tokens: tokens.clone(),
            edit_token: edit_token.map(str::to_string),
        };
        let client = Arc::clone(&self.client);
        let token = abort.clone();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let result = client.prepare_cache_key(request, token).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => track!("performance.system.serializeforcache", duration_ms),
                Err(RemoteError::Aborted) => {}
                Err(_) => track!("performance.system.serializeforcache.fail", duration_ms),
            }
            result
        });
        let future = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(RemoteError::network(e.to_string())))
        }
        .boxed()
        .shared();

        debug!(snapshot = ?snapshot.id, "Preparing cache key");
        *current = Some(Preparation {
            snapshot: snapshot.id,
            future: future.clone(),
            abort,
        });
        Some(future)
    }

    /// The preparation for `snapshot`, without starting one.
    pub async fn get(&self, snapshot: SnapshotId) -> Option<PreparedKey> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|p| p.snapshot == snapshot)
            .map(|p| p.future.clone())
    }

    /// Aborts any in-flight preparation and forgets the cached one.
    pub async fn invalidate(&self) {
        let mut current = self.current.write().await;
        if let Some(stale) = current.take() {
            debug!(snapshot = ?stale.snapshot, "Invalidating prepared cache key");
            stale.abort.cancel();
        }
    }

    /// Payload for a request about `snapshot`.
    ///
    /// Uses the prepared key when one resolves, otherwise falls back to
    /// sending the HTML inline. A cold or failed cache never blocks the
    /// request.
    pub async fn consume(&self, snapshot: &DocumentSnapshot) -> ContentPayload {
        if let Some(prepared) = self.get(snapshot.id).await {
            if let Ok(key) = prepared.await {
                return ContentPayload::CacheKey(key);
            }
        }
        ContentPayload::Html(Arc::clone(&snapshot.content))
    }
}
