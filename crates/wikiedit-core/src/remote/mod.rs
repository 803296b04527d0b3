//! Boundary to the page-edit API.
//!
//! Implementations own no state machine and never retry; retries are decided
//! by the session controller. Every call takes an abort token and resolves to
//! [`RemoteError::Aborted`] once it is cancelled.

mod error;
mod types;

pub use error::{
    ApiErrorInfo, BAD_CACHE_KEY, CaptchaInfo, EditApiInfo, RemoteError, SaveErrorPayload,
};
pub use types::*;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[async_trait]
pub trait RemoteEditClient: Send + Sync {
    async fn load(&self, request: LoadRequest, abort: CancellationToken)
    -> RemoteResult<LoadResponse>;

    async fn save(&self, request: SaveRequest, abort: CancellationToken)
    -> RemoteResult<SaveResponse>;

    async fn serialize(
        &self,
        request: SerializeRequest,
        abort: CancellationToken,
    ) -> RemoteResult<SerializeResponse>;

    async fn diff(&self, request: DiffRequest, abort: CancellationToken)
    -> RemoteResult<DiffResponse>;

    /// Uploads HTML once and returns a key later requests may send instead.
    async fn prepare_cache_key(
        &self,
        request: PrepareRequest,
        abort: CancellationToken,
    ) -> RemoteResult<CacheKey>;

    /// Fresh CSRF token plus the identity the API session now belongs to.
    async fn fetch_token_info(&self, abort: CancellationToken) -> RemoteResult<TokenInfo>;
}
