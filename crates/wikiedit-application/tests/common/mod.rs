//! Shared harness for controller integration tests.
//!
//! Wires an [`EditSessionController`] to a scripted remote client and the
//! in-memory host adapters from `wikiedit-infrastructure`.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use wikiedit_application::{DesktopPresentation, EditSessionController};
use wikiedit_core::config::{EditorConfig, UserPreferences};
use wikiedit_core::history::PageParams;
use wikiedit_core::page_view::PageChrome;
use wikiedit_core::remote::*;
use wikiedit_core::session::PageMetadata;
use wikiedit_infrastructure::{MemoryHistory, MemoryPageView, StaticHost};

/// Remote client answering from per-operation queues.
///
/// Every request is recorded. An empty queue answers with a network error.
#[derive(Default)]
pub struct ScriptedClient {
    loads: Mutex<VecDeque<RemoteResult<LoadResponse>>>,
    saves: Mutex<VecDeque<RemoteResult<SaveResponse>>>,
    diffs: Mutex<VecDeque<RemoteResult<DiffResponse>>>,
    serializations: Mutex<VecDeque<RemoteResult<SerializeResponse>>>,
    cache_keys: Mutex<VecDeque<RemoteResult<CacheKey>>>,
    tokens: Mutex<VecDeque<RemoteResult<TokenInfo>>>,

    pub load_requests: Mutex<Vec<LoadRequest>>,
    pub save_requests: Mutex<Vec<SaveRequest>>,
    pub diff_requests: Mutex<Vec<DiffRequest>>,
    pub serialize_requests: Mutex<Vec<SerializeRequest>>,
    pub prepare_requests: Mutex<Vec<PrepareRequest>>,
    pub token_requests: Mutex<usize>,

    /// Loads never answer; they resolve only when aborted.
    pub stall_loads: AtomicBool,
    /// Saves wait for `save_gate` before answering.
    pub hold_saves: AtomicBool,
    pub save_gate: Notify,
}

fn next<T>(queue: &Mutex<VecDeque<RemoteResult<T>>>, operation: &str) -> RemoteResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(RemoteError::network(format!("unscripted {operation}"))))
}

impl ScriptedClient {
    pub fn push_load(&self, result: RemoteResult<LoadResponse>) {
        self.loads.lock().unwrap().push_back(result);
    }

    pub fn push_save(&self, result: RemoteResult<SaveResponse>) {
        self.saves.lock().unwrap().push_back(result);
    }

    pub fn push_diff(&self, result: RemoteResult<DiffResponse>) {
        self.diffs.lock().unwrap().push_back(result);
    }

    pub fn push_serialize(&self, wikitext: &str) {
        self.serializations
            .lock()
            .unwrap()
            .push_back(Ok(SerializeResponse {
                wikitext: wikitext.to_string(),
            }));
    }

    pub fn push_cache_key(&self, result: RemoteResult<CacheKey>) {
        self.cache_keys.lock().unwrap().push_back(result);
    }

    pub fn push_token(&self, result: RemoteResult<TokenInfo>) {
        self.tokens.lock().unwrap().push_back(result);
    }

    pub fn loads(&self) -> Vec<LoadRequest> {
        self.load_requests.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<SaveRequest> {
        self.save_requests.lock().unwrap().clone()
    }

    pub fn diffs(&self) -> Vec<DiffRequest> {
        self.diff_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteEditClient for ScriptedClient {
    async fn load(
        &self,
        request: LoadRequest,
        abort: CancellationToken,
    ) -> RemoteResult<LoadResponse> {
        self.load_requests.lock().unwrap().push(request);
        if self.stall_loads.load(Ordering::SeqCst) {
            abort.cancelled().await;
            return Err(RemoteError::Aborted);
        }
        next(&self.loads, "load")
    }

    async fn save(
        &self,
        request: SaveRequest,
        _abort: CancellationToken,
    ) -> RemoteResult<SaveResponse> {
        self.save_requests.lock().unwrap().push(request);
        if self.hold_saves.load(Ordering::SeqCst) {
            self.save_gate.notified().await;
        }
        next(&self.saves, "save")
    }

    async fn serialize(
        &self,
        request: SerializeRequest,
        _abort: CancellationToken,
    ) -> RemoteResult<SerializeResponse> {
        self.serialize_requests.lock().unwrap().push(request);
        next(&self.serializations, "serialize")
    }

    async fn diff(
        &self,
        request: DiffRequest,
        _abort: CancellationToken,
    ) -> RemoteResult<DiffResponse> {
        self.diff_requests.lock().unwrap().push(request);
        next(&self.diffs, "diff")
    }

    async fn prepare_cache_key(
        &self,
        request: PrepareRequest,
        _abort: CancellationToken,
    ) -> RemoteResult<CacheKey> {
        self.prepare_requests.lock().unwrap().push(request);
        next(&self.cache_keys, "prepare")
    }

    async fn fetch_token_info(&self, _abort: CancellationToken) -> RemoteResult<TokenInfo> {
        *self.token_requests.lock().unwrap() += 1;
        next(&self.tokens, "token")
    }
}

/// Visual-mode HTML whose root element carries `revision`.
pub fn visual_html(revision: u64, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html about="https://en.wikipedia.org/wiki/Special:Redirect/revision/{revision}"><head></head><body>{body}</body></html>"#
    )
}

pub fn visual_load(revision: u64) -> LoadResponse {
    LoadResponse {
        content: visual_html(revision, "<p>Hello</p>"),
        etag: Some(format!("\"{revision}\"")),
        revision_id: Some(revision),
        base_timestamp: Some("20240101000000".to_string()),
        start_timestamp: Some("20240102000000".to_string()),
        notices: vec!["Remote notice".to_string()],
        ..Default::default()
    }
}

pub fn source_load(revision: u64, wikitext: &str) -> LoadResponse {
    LoadResponse {
        content: wikitext.to_string(),
        revision_id: Some(revision),
        base_timestamp: Some("20240101000000".to_string()),
        start_timestamp: Some("20240102000000".to_string()),
        ..Default::default()
    }
}

pub fn existing_page(revision: u64) -> PageMetadata {
    PageMetadata {
        title: "Test".to_string(),
        exists: true,
        current_revision_id: Some(revision),
        requested_revision_id: None,
        edit_token: Some("token+\\".to_string()),
    }
}

pub fn new_page() -> PageMetadata {
    PageMetadata {
        title: "Test".to_string(),
        exists: false,
        edit_token: Some("token+\\".to_string()),
        ..Default::default()
    }
}

pub fn read_chrome() -> PageChrome {
    PageChrome {
        document_title: "Test - Wikipedia".to_string(),
        content_html: "<p>Hello</p>".to_string(),
        selected_tab: "view".to_string(),
        url: "/wiki/Test".to_string(),
        ..Default::default()
    }
}

/// Config with no toolbar animation so tests do not wait on timers.
pub fn test_config() -> EditorConfig {
    let mut config = EditorConfig::default();
    config.presentation.toolbar_animation_ms = 0;
    config
}

pub struct Harness {
    pub controller: EditSessionController,
    pub client: Arc<ScriptedClient>,
    pub view: Arc<MemoryPageView>,
    pub presentation: Arc<DesktopPresentation>,
    pub host: Arc<StaticHost>,
    pub history: Arc<MemoryHistory>,
}

pub struct HarnessBuilder {
    config: EditorConfig,
    host: StaticHost,
    view: MemoryPageView,
}

impl HarnessBuilder {
    pub fn new(metadata: PageMetadata) -> Self {
        Self {
            config: test_config(),
            host: StaticHost::new(metadata),
            view: MemoryPageView::new(read_chrome()),
        }
    }

    pub fn config(mut self, f: impl FnOnce(&mut EditorConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn host(mut self, f: impl FnOnce(StaticHost) -> StaticHost) -> Self {
        self.host = f(self.host);
        self
    }

    pub fn preferences(self, preferences: UserPreferences) -> Self {
        self.host(|host| host.with_preferences(preferences))
    }

    /// Answer every confirmation prompt with `answer` unless scripted.
    pub fn default_answer(mut self, answer: bool) -> Self {
        self.view = self.view.with_default_answer(answer);
        self
    }

    pub fn build(self) -> Harness {
        let client = Arc::new(ScriptedClient::default());
        let view = Arc::new(self.view);
        let presentation = Arc::new(DesktopPresentation::new(view.clone(), &self.config));
        let host = Arc::new(self.host);
        let history = Arc::new(MemoryHistory::new(PageParams::new("Test")));
        let controller = EditSessionController::new(
            self.config,
            client.clone(),
            presentation.clone(),
            host.clone(),
            history.clone(),
        );
        Harness {
            controller,
            client,
            view,
            presentation,
            host,
            history,
        }
    }
}

pub fn harness(metadata: PageMetadata) -> Harness {
    HarnessBuilder::new(metadata).build()
}
