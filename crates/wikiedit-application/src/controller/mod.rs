//! The editing-session controller.
//!
//! One controller drives the editor on one page. It owns the lifecycle state
//! machine and the per-operation guards, and calls out to the remote client,
//! the presentation, the host and the history adapter. None of those change
//! controller state themselves.
//!
//! State sits behind a `tokio::sync::RwLock` that is never held across an
//! `.await`: every suspension point (network, confirmations, toolbar
//! animation) happens with the lock released, and state is re-checked after.

mod activation;
mod deactivation;
mod mode_switch;
mod review;
mod save;

pub use save::SaveOutcome;

use crate::cache_key_broker::CacheKeyBroker;
use crate::history_sync::{HistorySyncAdapter, NavigationIntent};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wikiedit_core::config::EditorConfig;
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::error::{EditError, Result};
use wikiedit_core::history::{HistoryBackend, HistoryState, PageParams};
use wikiedit_core::host::HostEnvironment;
use wikiedit_core::presentation::{EditContext, PresentationGateway};
use wikiedit_core::remote::RemoteEditClient;
use wikiedit_core::session::{Lifecycle, OperationKind, PageState, Session};

const SAVE_WARNING: &str = "Leaving this page may cause you to lose any changes you have made.";

/// Outcome of an activation, shared with every caller waiting on it.
type ActivationStatus = Option<Result<()>>;

struct EditorState {
    lifecycle: Lifecycle,
    page: PageState,
    session: Option<Session>,
    /// Mode used for the next activation; follows mode switches.
    default_mode: EditMode,
    activation: Option<watch::Receiver<ActivationStatus>>,
    activation_cancel: CancellationToken,
    original_edit_on_double_click: Option<bool>,
}

struct Inner {
    client: Arc<dyn RemoteEditClient>,
    presentation: Arc<dyn PresentationGateway>,
    host: Arc<dyn HostEnvironment>,
    history: HistorySyncAdapter,
    broker: CacheKeyBroker,
    config: EditorConfig,
    state: RwLock<EditorState>,
}

/// Editing-session controller. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct EditSessionController {
    inner: Arc<Inner>,
}

impl EditSessionController {
    pub fn new(
        config: EditorConfig,
        client: Arc<dyn RemoteEditClient>,
        presentation: Arc<dyn PresentationGateway>,
        host: Arc<dyn HostEnvironment>,
        history: Arc<dyn HistoryBackend>,
    ) -> Self {
        let mut page = PageState::from_metadata(&host.page_metadata());
        page.initial_edit_summary = host.preset_summary();
        let history = HistorySyncAdapter::new(history, config.presentation.single_edit_tab);
        history.install();

        let state = EditorState {
            lifecycle: Lifecycle::Inactive,
            page,
            session: None,
            default_mode: config.editor.default_mode,
            activation: None,
            activation_cancel: CancellationToken::new(),
            original_edit_on_double_click: None,
        };

        Self {
            inner: Arc::new(Inner {
                broker: CacheKeyBroker::new(Arc::clone(&client)),
                client,
                presentation,
                host,
                history,
                config,
                state: RwLock::new(state),
            }),
        }
    }

    // ============================================================================
    // Read accessors
    // ============================================================================

    pub async fn lifecycle(&self) -> Lifecycle {
        self.inner.state.read().await.lifecycle
    }

    pub async fn page_state(&self) -> PageState {
        self.inner.state.read().await.page.clone()
    }

    /// Revision the next save is based on.
    pub async fn revision_id(&self) -> Option<u64> {
        self.inner.state.read().await.page.revision_id
    }

    pub async fn mode(&self) -> Option<EditMode> {
        self.inner
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.mode)
    }

    pub async fn section(&self) -> Option<Section> {
        self.inner
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.section)
    }

    pub async fn is_edited(&self) -> bool {
        self.with_session(|s| s.edited).await.unwrap_or(false)
    }

    pub async fn is_pending(&self, kind: OperationKind) -> bool {
        self.with_session(|s| s.pending.is_pending(kind))
            .await
            .unwrap_or(false)
    }

    /// Nothing outstanding, including when there is no session at all.
    pub async fn is_idle(&self) -> bool {
        self.with_session(|s| s.pending.is_idle())
            .await
            .unwrap_or(true)
    }

    /// Content of the live document.
    pub async fn document_content(&self) -> Option<String> {
        self.with_session(|s| s.document().map(|d| d.content().to_string()))
            .await
            .flatten()
    }

    pub async fn edit_notices(&self) -> Vec<String> {
        self.with_session(|s| s.notices.clone())
            .await
            .unwrap_or_default()
    }

    pub fn broker(&self) -> &CacheKeyBroker {
        &self.inner.broker
    }

    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    // ============================================================================
    // Document edits
    // ============================================================================

    /// Applies a user edit to the live document.
    ///
    /// Any cache-key preparation and cached review for the previous snapshot
    /// are dropped.
    pub async fn update_document(&self, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        {
            let mut state = self.inner.state.write().await;
            let session = active_session_mut(&mut state, "edit")?;
            session.edit_document(content);
        }
        self.inner.broker.invalidate().await;
        self.inner
            .presentation
            .update_save_dialog(wikiedit_core::presentation::SaveDialogUpdate::ClearReview);
        self.refresh_save_state().await;
        Ok(())
    }

    /// Sets the heading of a new section.
    pub async fn set_section_title(&self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        {
            let mut state = self.inner.state.write().await;
            let session = active_session_mut(&mut state, "edit")?;
            session.section_title = Some(title);
            session.clear_review();
        }
        self.inner
            .presentation
            .update_save_dialog(wikiedit_core::presentation::SaveDialogUpdate::ClearReview);
        self.refresh_save_state().await;
        Ok(())
    }

    /// Message to show before the page unloads, if leaving would lose edits.
    pub async fn before_unload_message(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        let session = state.session.as_ref()?;
        let warn = session.edited
            && !session.pending.is_pending(OperationKind::Submit)
            && self.inner.host.preferences().use_edit_warning;
        warn.then(|| SAVE_WARNING.to_string())
    }

    // ============================================================================
    // History
    // ============================================================================

    /// Reacts to a back/forward navigation.
    ///
    /// Entries without the editor's marker are ignored.
    pub async fn handle_history_pop(
        &self,
        state: Option<HistoryState>,
        params: PageParams,
    ) -> Result<()> {
        let (lifecycle, mode) = {
            let state = self.inner.state.read().await;
            (state.lifecycle, state.session.as_ref().map(|s| s.mode))
        };
        let source_available = self.inner.config.editor.is_available(EditMode::Source);
        let Some(intent) =
            self.inner
                .history
                .on_pop(state.as_ref(), &params, lifecycle, mode, source_available)
        else {
            return Ok(());
        };

        debug!(?intent, "Replaying history navigation");
        let result = match intent {
            NavigationIntent::Activate { mode, section } => self.activate(mode, section).await,
            NavigationIntent::SwitchMode(mode) => self.switch_mode(mode, false).await.map(|_| ()),
            NavigationIntent::Deactivate => self
                .deactivate(false, Some("navigate-back"))
                .await
                .map(|_| ()),
        };
        self.inner.history.clear_pop_guard();
        result
    }

    // ============================================================================
    // Internal helpers
    // ============================================================================

    async fn with_session<T>(&self, f: impl FnOnce(&Session) -> T) -> Option<T> {
        let state = self.inner.state.read().await;
        state.session.as_ref().map(f)
    }

    async fn with_session_mut<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut state = self.inner.state.write().await;
        state.session.as_mut().map(f)
    }

    async fn finish_operation(&self, kind: OperationKind) {
        self.with_session_mut(|s| s.pending.finish(kind)).await;
    }

    async fn edit_context(&self) -> Option<EditContext> {
        let state = self.inner.state.read().await;
        let session = state.session.as_ref()?;
        Some(EditContext {
            page_name: state.page.page_name.clone(),
            page_exists: state.page.page_exists,
            mode: session.mode,
            section: session.section,
        })
    }

    /// Re-evaluates the save button and the unload warning.
    async fn refresh_save_state(&self) {
        let (enabled, warning) = {
            let mut state = self.inner.state.write().await;
            let restoring = state.page.restoring;
            let Some(session) = state.session.as_mut() else {
                return;
            };
            let titled = session
                .section_title
                .as_deref()
                .is_some_and(|t| !t.is_empty());
            session.edited = session.edited || session.from_edited_state || titled;
            (session.edited || restoring, session.ready)
        };
        self.inner.presentation.set_save_enabled(enabled);
        if warning {
            let message = self.before_unload_message().await;
            self.inner.presentation.set_unload_warning(message);
        }
    }

    fn is_mode_available(&self, mode: EditMode) -> bool {
        self.inner.config.editor.is_available(mode)
    }
}

fn active_session_mut<'a>(
    state: &'a mut EditorState,
    operation: &'static str,
) -> Result<&'a mut Session> {
    if state.lifecycle != Lifecycle::Active {
        return Err(EditError::InvalidLifecycle {
            operation,
            state: state.lifecycle,
        });
    }
    state
        .session
        .as_mut()
        .ok_or_else(|| EditError::internal("active without a session"))
}

fn active_session<'a>(state: &'a EditorState, operation: &'static str) -> Result<&'a Session> {
    if state.lifecycle != Lifecycle::Active {
        return Err(EditError::InvalidLifecycle {
            operation,
            state: state.lifecycle,
        });
    }
    state
        .session
        .as_ref()
        .ok_or_else(|| EditError::internal("active without a session"))
}
