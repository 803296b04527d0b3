//! Activation: Inactive -> Activating -> Active.
//!
//! Activation completes only when both the content load and the toolbar
//! setup have finished. Both run inside one spawned pipeline, raced against
//! the session's cancellation token, and the outcome is published on a watch
//! channel so re-entrant callers wait on the same result.

use super::{ActivationStatus, EditSessionController};
use std::cmp::max;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wikiedit_core::document::{Document, EditMode, Section, section_summary};
use wikiedit_core::error::{EditError, Result};
use wikiedit_core::presentation::{LoadFailure, LoadRecovery};
use wikiedit_core::remote::{LoadRequest, LoadResponse};
use wikiedit_core::session::{Lifecycle, Session};

/// Where the content for a (re)load comes from.
#[derive(Debug, Clone)]
pub(super) enum LoadSource {
    Remote(LoadRequest),
    /// Content already in hand, e.g. edits serialized for a mode switch.
    Prepared {
        mode: EditMode,
        response: LoadResponse,
    },
}

impl LoadSource {
    fn mode(&self) -> EditMode {
        match self {
            Self::Remote(request) => request.mode,
            Self::Prepared { mode, .. } => *mode,
        }
    }
}

enum Recovery {
    Retry,
    Load(LoadRequest),
    GiveUp,
}

impl EditSessionController {
    /// Opens the editor on this page.
    ///
    /// Calling it again while activating waits for the same activation; while
    /// active it returns immediately. Exactly one load is ever in flight.
    ///
    /// # Arguments
    ///
    /// * `mode` - Editing mode to open; an unavailable mode falls back to the default
    /// * `section` - Section to edit, or [`Section::Whole`]
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Aborted`] if the editor is closed before it is
    /// ready, or the load error when the user gives up on a failed load.
    pub async fn activate(&self, mode: EditMode, section: Section) -> Result<()> {
        let mode = if self.is_mode_available(mode) {
            mode
        } else {
            self.inner.state.read().await.default_mode
        };

        let (source, load_abort, cancel, tx, rx) = {
            let mut state = self.inner.state.write().await;
            match state.lifecycle {
                Lifecycle::Active => return Ok(()),
                Lifecycle::Activating => {
                    let pending = state.activation.clone();
                    drop(state);
                    return match pending {
                        Some(rx) => wait_for_activation(rx).await,
                        None => Err(EditError::internal("activating without a pipeline")),
                    };
                }
                Lifecycle::Deactivating | Lifecycle::Inactive => {}
            }

            let next = state.lifecycle.transition(Lifecycle::Activating, "activate")?;
            let mut session = Session::new(mode, section);
            let load_abort = session.pending.begin_load()?;
            let request = LoadRequest {
                mode,
                page: state.page.page_name.clone(),
                section,
                revision_id: state.page.load_revision(),
                convert_wikitext: None,
            };

            let (tx, rx) = watch::channel(None);
            state.lifecycle = next;
            state.session = Some(session);
            state.activation = Some(rx.clone());
            state.activation_cancel = CancellationToken::new();
            state.default_mode = mode;
            (
                LoadSource::Remote(request),
                load_abort,
                state.activation_cancel.clone(),
                tx,
                rx,
            )
        };

        info!(%mode, ?section, "Activating editor");
        self.bind_page_handlers().await;

        let scroll_top = if mode == EditMode::Source && !section.is_whole() {
            0
        } else {
            self.inner.presentation.scroll_position()
        };
        self.with_session_mut(|s| s.scroll_top = Some(scroll_top))
            .await;

        if let Some(context) = self.edit_context().await {
            self.inner.presentation.enter_edit_mode(&context).await;
        }
        self.inner.history.push_edit_state(mode, section);
        track!("mwedit.init", mode = %mode);

        self.spawn_pipeline(source, load_abort, cancel, tx);
        wait_for_activation(rx).await
    }

    /// Runs the load/toolbar pipeline in its own task and publishes the outcome.
    pub(super) fn spawn_pipeline(
        &self,
        source: LoadSource,
        load_abort: CancellationToken,
        cancel: CancellationToken,
        tx: watch::Sender<ActivationStatus>,
    ) {
        let controller = self.clone();
        tokio::spawn(async move {
            let result = controller.run_pipeline(source, load_abort, cancel).await;
            if let Err(e) = &result {
                if !e.is_aborted() {
                    warn!(error = %e, "Activation failed");
                }
            }
            // Receivers may all be gone; the state is already settled.
            let _ = tx.send(Some(result));
        });
    }

    async fn run_pipeline(
        &self,
        mut source: LoadSource,
        mut load_abort: CancellationToken,
        cancel: CancellationToken,
    ) -> Result<()> {
        loop {
            let mode = source.mode();
            let joined = async {
                tokio::try_join!(self.load_until_ready(&source, load_abort.clone()), async {
                    self.inner.presentation.show_toolbar(mode).await;
                    Ok::<(), EditError>(())
                })
            };
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(EditError::Aborted),
                result = joined => result.map(|_| ()),
            };
            self.with_session_mut(|s| s.pending.finish_load(&load_abort))
                .await;

            let error = match outcome {
                Ok(()) => return self.surface_ready().await,
                Err(e) if e.is_aborted() => return Err(e),
                Err(e) => e,
            };

            match self.recover_from_load_failure(&error, mode).await {
                Recovery::Retry => {}
                Recovery::Load(request) => {
                    self.inner.presentation.hide_toolbar().await;
                    source = LoadSource::Remote(request);
                }
                Recovery::GiveUp => return Err(error),
            }
            load_abort = self.begin_reload().await?;
        }
    }

    /// Loads content, retrying once when the document and the API disagree
    /// on the revision.
    async fn load_until_ready(&self, source: &LoadSource, abort: CancellationToken) -> Result<()> {
        let mut request = match source {
            LoadSource::Prepared { mode, response } => {
                let document = Document::new(*mode, response.content.as_str());
                return self.install(document, response).await;
            }
            LoadSource::Remote(request) => request.clone(),
        };

        loop {
            let response = self
                .inner
                .client
                .load(request.clone(), abort.clone())
                .await?;
            let document = Document::new(request.mode, response.content.as_str());
            match self.reconcile_revision(&document, &response).await? {
                Some(revision_id) => request.revision_id = Some(revision_id),
                None => return self.install(document, &response).await,
            }
        }
    }

    /// Returns the revision to reload when the two revision ids disagree.
    async fn reconcile_revision(
        &self,
        document: &Document,
        response: &LoadResponse,
    ) -> Result<Option<u64>> {
        let (Some(embedded), Some(reported)) = (document.embedded_revision_id(), response.revision_id)
        else {
            return Ok(None);
        };
        if embedded == reported {
            return Ok(None);
        }

        let mut state = self.inner.state.write().await;
        let session = state
            .session
            .as_mut()
            .ok_or(EditError::Aborted)?;
        if session.retried_revision_mismatch {
            return Err(EditError::invalid_response(format!(
                "Revision IDs (doc={embedded},api={reported}) returned by server do not match"
            )));
        }
        session.retried_revision_mismatch = true;
        let newest = max(embedded, reported);
        state.page.requested_revision_id = Some(newest);
        warn!(embedded, reported, "Revision mismatch, reloading revision {newest}");
        track!("mwedit.load.revisionMismatch", embedded, reported);
        Ok(Some(newest))
    }

    async fn install(&self, document: Document, response: &LoadResponse) -> Result<()> {
        let local = self.inner.host.local_notices();
        let mut state = self.inner.state.write().await;
        if state.lifecycle != Lifecycle::Activating {
            return Err(EditError::Aborted);
        }
        if let Some(revision_id) = response.revision_id {
            state.page.revision_id = Some(revision_id);
        }
        let session = state.session.as_mut().ok_or(EditError::Aborted)?;
        session.install_load(document, response);
        session.notices = response.notices.iter().cloned().chain(local).collect();
        debug!(revision = ?response.revision_id, "Content loaded");
        Ok(())
    }

    /// Content and toolbar are both in place: Activating -> Active.
    async fn surface_ready(&self) -> Result<()> {
        let preset = self.inner.host.preset_summary();
        let scroll_top = {
            let mut state = self.inner.state.write().await;
            if state.lifecycle != Lifecycle::Activating {
                return Err(EditError::Aborted);
            }
            let next = state.lifecycle.transition(Lifecycle::Active, "activate")?;
            let super::EditorState { page, session, .. } = &mut *state;
            let session = session.as_mut().ok_or(EditError::Aborted)?;
            session.ready = true;
            session.edited = session.from_edited_state;
            session.fallback_loading = false;
            session.links.stop_assuming_existence();

            if preset.is_none() {
                let heading = session
                    .document()
                    .and_then(|d| d.section_heading(session.section));
                if let Some(heading) = heading {
                    page.initial_edit_summary = Some(section_summary(&heading));
                }
            }
            let scroll_top = session.scroll_top;
            state.lifecycle = next;
            scroll_top
        };

        if let Some(context) = self.edit_context().await {
            self.inner.presentation.surface_ready(&context);
        }
        if let Some(top) = scroll_top {
            self.inner.presentation.restore_scroll_position(top);
        }
        self.refresh_save_state().await;
        info!("Editor ready");
        track!("mwedit.ready");
        Ok(())
    }

    async fn recover_from_load_failure(&self, error: &EditError, mode: EditMode) -> Recovery {
        let fallback_loading = self
            .with_session(|s| s.fallback_loading)
            .await
            .unwrap_or(false);
        track!("mwedit.loadFailure", mode = %mode, error = %error);

        if fallback_loading {
            // The alternate mode failed too; hand over to the classic editor.
            let target = self.classic_editor_params().await;
            let _ = self.deactivate(true, Some("loadfail")).await;
            self.inner.presentation.navigate(target);
            return Recovery::GiveUp;
        }

        let alternate = mode.other();
        let fallback = (self.is_mode_available(alternate)
            && self.inner.presentation.offers_mode_fallback())
        .then_some(alternate);
        let failure = LoadFailure {
            message: error.to_string(),
            fallback,
        };

        match self.inner.presentation.choose_load_recovery(&failure).await {
            LoadRecovery::Retry => {
                debug!("Retrying load");
                Recovery::Retry
            }
            LoadRecovery::FallBack(target) if Some(target) == fallback => {
                let section = self
                    .with_session_mut(|s| {
                        s.fallback_loading = true;
                        s.section
                    })
                    .await;
                match section {
                    Some(section) => Recovery::Load(self.load_request_for(target, section).await),
                    None => Recovery::GiveUp,
                }
            }
            LoadRecovery::FallBack(_) | LoadRecovery::Abandon => {
                let _ = self.deactivate(true, Some("loadfail")).await;
                Recovery::GiveUp
            }
        }
    }

    /// Re-arms the load guard for another attempt within the same activation.
    async fn begin_reload(&self) -> Result<CancellationToken> {
        let mut state = self.inner.state.write().await;
        if state.lifecycle != Lifecycle::Activating {
            return Err(EditError::Aborted);
        }
        let session = state.session.as_mut().ok_or(EditError::Aborted)?;
        session.pending.begin_load()
    }

    pub(super) async fn load_request_for(&self, mode: EditMode, section: Section) -> LoadRequest {
        let state = self.inner.state.read().await;
        LoadRequest {
            mode,
            page: state.page.page_name.clone(),
            section,
            revision_id: state.page.load_revision(),
            convert_wikitext: None,
        }
    }

    async fn bind_page_handlers(&self) {
        self.inner.host.bind_handlers();
        if self.inner.host.preferences().edit_on_double_click {
            self.inner.host.set_edit_on_double_click(false);
            self.inner.state.write().await.original_edit_on_double_click = Some(true);
        }
    }
}

/// Waits for the pipeline behind `rx` to publish its outcome.
pub(super) async fn wait_for_activation(mut rx: watch::Receiver<ActivationStatus>) -> Result<()> {
    match rx.wait_for(Option::is_some).await {
        Ok(status) => (*status).clone().unwrap_or(Err(EditError::Aborted)),
        Err(_) => Err(EditError::Aborted),
    }
}
