use crate::wire;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;
use wikiedit_core::config::ApiConfig;
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::remote::{
    CacheKey, ContentPayload, DiffRequest, DiffResponse, LoadRequest, LoadResponse,
    PrepareRequest, RemoteEditClient, RemoteError, RemoteResult, SaveRequest, SaveResponse,
    SerializeRequest, SerializeResponse, TokenInfo,
};
use wikiedit_core::session::RevisionTokens;

/// Form or query parameters of one API call, in insertion order.
#[derive(Debug, Default)]
struct Params(Vec<(String, String)>);

impl Params {
    fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }
}

/// [`RemoteEditClient`] over a MediaWiki `api.php` endpoint.
///
/// Keeps a cookie store so a logged-in session survives between calls.
#[derive(Clone)]
pub struct MediaWikiEditClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl MediaWikiEditClient {
    pub fn new(config: &ApiConfig) -> RemoteResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            RemoteError::network(format!("Invalid API endpoint {}: {}", config.endpoint, e))
        })?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(|e| RemoteError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn base_params(action: &'static str) -> Params {
        let mut params = Params::default();
        params.push("action", action);
        params.push("format", "json");
        params.push("formatversion", "2");
        params
    }

    fn edit_params(paction: &'static str, page: &str) -> Params {
        let mut params = Self::base_params("visualeditoredit");
        params.push("paction", paction.to_string());
        params.push("page", page.to_string());
        params
    }

    async fn post(&self, params: Params, abort: &CancellationToken) -> RemoteResult<Value> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .form(&params.0)
            .timeout(self.timeout);
        self.send(request, abort).await
    }

    async fn get(&self, params: Params, abort: &CancellationToken) -> RemoteResult<Value> {
        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&params.0)
            .timeout(self.timeout);
        self.send(request, abort).await
    }

    /// Sends `request`, resolving to `Aborted` as soon as `abort` fires.
    async fn send(&self, request: RequestBuilder, abort: &CancellationToken) -> RemoteResult<Value> {
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| RemoteError::network(format!("API request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(RemoteError::network(format!(
                    "API error ({}): {}",
                    status, error_text
                )));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| RemoteError::network(format!("Failed to parse API response: {}", e)))
        };

        let body = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(RemoteError::Aborted),
            body = exchange => body?,
        };

        match wire::api_error(&body) {
            Some(err) => Err(err),
            None => Ok(body),
        }
    }
}

fn push_revision(params: &mut Params, tokens: &RevisionTokens) {
    if let Some(id) = tokens.revision_id {
        params.push("oldid", id.to_string());
    }
    if let Some(etag) = &tokens.etag {
        params.push("etag", etag.clone());
    }
}

fn push_timestamps(params: &mut Params, tokens: &RevisionTokens) {
    if let Some(ts) = &tokens.base_timestamp {
        params.push("basetimestamp", ts.clone());
    }
    if let Some(ts) = &tokens.start_timestamp {
        params.push("starttimestamp", ts.clone());
    }
}

fn push_section(params: &mut Params, section: &Section) {
    if let Some(section) = section.as_param() {
        params.push("section", section);
    }
}

/// `visualeditoredit` refuses every `paction` without a CSRF token.
fn push_token(params: &mut Params, edit_token: &Option<String>) {
    if let Some(token) = edit_token {
        params.push("token", token.clone());
    }
}

fn push_payload(params: &mut Params, payload: &ContentPayload) {
    match payload {
        ContentPayload::CacheKey(key) => params.push("cachekey", key.as_str()),
        ContentPayload::Html(html) => params.push("html", html.to_string()),
        ContentPayload::Wikitext(text) => params.push("wikitext", text.to_string()),
    }
}

fn payload_kind(payload: &ContentPayload) -> &'static str {
    match payload {
        ContentPayload::CacheKey(_) => "withCacheKey",
        _ => "withoutCacheKey",
    }
}

#[async_trait]
impl RemoteEditClient for MediaWikiEditClient {
    async fn load(
        &self,
        request: LoadRequest,
        abort: CancellationToken,
    ) -> RemoteResult<LoadResponse> {
        let mut params = Self::base_params("visualeditor");
        let paction = match request.mode {
            EditMode::Visual => "parse",
            EditMode::Source => "wikitext",
        };
        params.push("paction", paction.to_string());
        params.push("page", request.page.clone());
        if let Some(id) = request.revision_id {
            params.push("oldid", id.to_string());
        }
        push_section(&mut params, &request.section);
        if let Some(wikitext) = &request.convert_wikitext {
            params.push("wikitext", wikitext.clone());
            params.push("pst", "1".to_string());
        }

        debug!(page = %request.page, mode = %request.mode, "Loading page");
        let body = self.post(params, &abort).await?;
        wire::load_response(&body)
    }

    async fn save(
        &self,
        request: SaveRequest,
        abort: CancellationToken,
    ) -> RemoteResult<SaveResponse> {
        let mut params = Self::edit_params("save", &request.page);
        push_revision(&mut params, &request.tokens);
        push_timestamps(&mut params, &request.tokens);
        push_section(&mut params, &request.section);
        if let Some(title) = &request.section_title {
            params.push("sectiontitle", title.clone());
        }
        push_token(&mut params, &request.edit_token);
        for (name, value) in request.options.to_params() {
            params.push(&name, value);
        }
        push_payload(&mut params, &request.payload);

        let started = Instant::now();
        let kind = payload_kind(&request.payload);
        let result = self.post(params, &abort).await;
        debug!(
            page = %request.page,
            payload = kind,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Save request finished"
        );
        wire::save_response(&result?)
    }

    async fn serialize(
        &self,
        request: SerializeRequest,
        abort: CancellationToken,
    ) -> RemoteResult<SerializeResponse> {
        if let ContentPayload::Wikitext(text) = &request.payload {
            return Ok(SerializeResponse {
                wikitext: text.to_string(),
            });
        }
        let mut params = Self::edit_params("serialize", &request.page);
        push_revision(&mut params, &request.tokens);
        push_token(&mut params, &request.edit_token);
        push_payload(&mut params, &request.payload);

        let body = self.post(params, &abort).await?;
        wire::serialize_response(&body)
    }

    async fn diff(
        &self,
        request: DiffRequest,
        abort: CancellationToken,
    ) -> RemoteResult<DiffResponse> {
        let mut params = Self::edit_params("diff", &request.page);
        push_revision(&mut params, &request.tokens);
        push_section(&mut params, &request.section);
        push_token(&mut params, &request.edit_token);
        push_payload(&mut params, &request.payload);

        let body = self.post(params, &abort).await?;
        wire::diff_response(&body)
    }

    async fn prepare_cache_key(
        &self,
        request: PrepareRequest,
        abort: CancellationToken,
    ) -> RemoteResult<CacheKey> {
        let mut params = Self::edit_params("serializeforcache", &request.page);
        push_revision(&mut params, &request.tokens);
        push_token(&mut params, &request.edit_token);
        params.push("html", request.html.to_string());

        let body = self.post(params, &abort).await?;
        let key = wire::cache_key_response(&body);
        if let Err(err) = &key {
            warn!(page = %request.page, error = %err, "Cache key preparation failed");
        }
        key
    }

    async fn fetch_token_info(&self, abort: CancellationToken) -> RemoteResult<TokenInfo> {
        let mut params = Self::base_params("query");
        params.push("meta", "tokens|userinfo".to_string());
        params.push("type", "csrf".to_string());

        let body = self.get(params, &abort).await?;
        wire::token_response(&body)
    }
}
