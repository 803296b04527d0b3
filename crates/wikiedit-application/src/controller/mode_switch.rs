//! Switching between visual and source editing, and between sections.
//!
//! A switch reloads the surface inside the running session: the lifecycle
//! goes Active -> Activating -> Active and never passes through Inactive.

use super::activation::{LoadSource, wait_for_activation};
use super::{EditSessionController, active_session_mut};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::error::{EditError, Result};
use wikiedit_core::history::PageParams;
use wikiedit_core::presentation::ConfirmPrompt;
use wikiedit_core::remote::LoadResponse;
use wikiedit_core::session::Lifecycle;

impl EditSessionController {
    /// Switches the editing mode.
    ///
    /// # Arguments
    ///
    /// * `target` - Mode to switch to
    /// * `discard_changes` - Reload fresh content instead of converting the edits
    ///
    /// # Returns
    ///
    /// `false` when already in `target` or the user declined to discard.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no active session or converting the
    /// edits fails.
    pub async fn switch_mode(&self, target: EditMode, discard_changes: bool) -> Result<bool> {
        let current = {
            let state = self.inner.state.read().await;
            if state.lifecycle != Lifecycle::Active {
                return Err(EditError::InvalidLifecycle {
                    operation: "switch mode",
                    state: state.lifecycle,
                });
            }
            state.session.as_ref().map(|s| s.mode)
        };
        if current == Some(target) {
            return Ok(false);
        }

        info!(%target, discard_changes, "Switching editor mode");
        match target {
            EditMode::Source => self.switch_to_source(discard_changes).await,
            EditMode::Visual if self.is_mode_available(EditMode::Visual) => {
                self.switch_to_visual(discard_changes).await
            }
            EditMode::Visual => Err(EditError::config("visual editing is not available")),
        }
    }

    async fn switch_to_source(&self, discard_changes: bool) -> Result<bool> {
        let edited = self.is_edited().await;

        if !self.is_mode_available(EditMode::Source) {
            if discard_changes {
                let abort_type = if edited { "switchwithout" } else { "switchnochange" };
                track!("mwedit.abort", abort_type, mechanism = "navigate");
                let target = self.classic_editor_params().await;
                self.deactivate(true, Some("switch")).await?;
                self.inner.presentation.navigate(target);
            } else {
                let wikitext = self.request_serialize().await?;
                let fields = BTreeMap::from([
                    ("wpDiff".to_string(), "1".to_string()),
                    ("wpAutoSummary".to_string(), String::new()),
                ]);
                self.submit(wikitext, fields).await?;
            }
            return Ok(true);
        }

        let source = if discard_changes {
            self.with_session_mut(|s| s.fallback_loading = true).await;
            LoadSource::Remote(
                self.load_request_for(EditMode::Source, Section::Whole)
                    .await,
            )
        } else {
            let wikitext = self.request_serialize().await?;
            let response = self.prepared_response(wikitext, edited).await?;
            LoadSource::Prepared {
                mode: EditMode::Source,
                response,
            }
        };
        self.reload_surface(source, Section::Whole, edited && !discard_changes)
            .await
    }

    async fn switch_to_visual(&self, discard_changes: bool) -> Result<bool> {
        let (section, edited, wikitext) = {
            let state = self.inner.state.read().await;
            let session = state
                .session
                .as_ref()
                .ok_or_else(|| EditError::internal("active without a session"))?;
            (
                session.section,
                session.edited,
                session.document().map(|d| d.content().to_string()),
            )
        };

        if !section.is_whole() {
            // Sections cannot be converted; only a whole-page reload is possible.
            if edited
                && !discard_changes
                && !self
                    .inner
                    .presentation
                    .confirm(ConfirmPrompt::SwitchDiscardOnly)
                    .await
            {
                return Ok(false);
            }
            let request = self
                .load_request_for(EditMode::Visual, Section::Whole)
                .await;
            return self
                .reload_surface(LoadSource::Remote(request), Section::Whole, false)
                .await;
        }

        let keep = edited && !discard_changes;
        let mut request = self
            .load_request_for(EditMode::Visual, Section::Whole)
            .await;
        if keep {
            request.convert_wikitext = wikitext;
        }
        self.reload_surface(LoadSource::Remote(request), Section::Whole, keep)
            .await
    }

    /// Moves source editing to another section.
    ///
    /// Unsaved edits are lost; the user is asked first unless `no_confirm`.
    pub async fn switch_section(&self, section: Section, no_confirm: bool) -> Result<bool> {
        let (mode, current, edited) = {
            let state = self.inner.state.read().await;
            if state.lifecycle != Lifecycle::Active {
                return Err(EditError::InvalidLifecycle {
                    operation: "switch section",
                    state: state.lifecycle,
                });
            }
            let session = state
                .session
                .as_ref()
                .ok_or_else(|| EditError::internal("active without a session"))?;
            (session.mode, session.section, session.edited)
        };
        if current == section {
            return Ok(false);
        }

        let ask = edited && !no_confirm && self.inner.host.preferences().use_edit_warning;
        if ask
            && !self
                .inner
                .presentation
                .confirm(ConfirmPrompt::UnsavedChanges)
                .await
        {
            return Ok(false);
        }

        let request = self.load_request_for(mode, section).await;
        self.reload_surface(LoadSource::Remote(request), section, false)
            .await
    }

    /// Replaces the document inside the running session.
    async fn reload_surface(
        &self,
        source: LoadSource,
        section: Section,
        keep_edited: bool,
    ) -> Result<bool> {
        let (load_abort, cancel, rx, tx) = {
            let mut state = self.inner.state.write().await;
            let session = active_session_mut(&mut state, "reload")?;
            let load_abort = session.pending.begin_load()?;
            session.take_document();
            session.section = section;
            session.ready = false;
            session.edited = false;
            session.from_edited_state = keep_edited;
            session.retried_revision_mismatch = false;
            session.captcha = None;

            state.lifecycle = state.lifecycle.transition(Lifecycle::Activating, "reload")?;
            let (tx, rx) = watch::channel(None);
            state.activation = Some(rx.clone());
            state.activation_cancel = CancellationToken::new();
            (load_abort, state.activation_cancel.clone(), rx, tx)
        };

        let mode = match &source {
            LoadSource::Remote(request) => request.mode,
            LoadSource::Prepared { mode, .. } => *mode,
        };
        self.inner.state.write().await.default_mode = mode;
        self.inner.broker.invalidate().await;
        self.inner.presentation.close_dialogs();
        self.inner.presentation.hide_toolbar().await;

        self.spawn_pipeline(source, load_abort, cancel, tx);
        wait_for_activation(rx).await?;
        self.inner.history.push_edit_state(mode, section);
        Ok(true)
    }

    /// Edits converted to wikitext, presented as if freshly loaded.
    async fn prepared_response(&self, wikitext: String, edited: bool) -> Result<LoadResponse> {
        let state = self.inner.state.read().await;
        let session = state
            .session
            .as_ref()
            .ok_or_else(|| EditError::internal("active without a session"))?;
        let tokens = session.tokens();
        Ok(LoadResponse {
            content: wikitext,
            etag: tokens.etag.clone(),
            revision_id: tokens.revision_id,
            base_timestamp: tokens.base_timestamp.clone(),
            start_timestamp: tokens.start_timestamp.clone(),
            notices: session.notices.clone(),
            checkboxes: session.checkboxes.clone(),
            protected_classes: session.protected_classes.clone(),
            from_edited_state: edited,
            ..Default::default()
        })
    }

    /// Classic wikitext editor on the same revision.
    pub(super) async fn classic_editor_params(&self) -> PageParams {
        let state = self.inner.state.read().await;
        let mut params = PageParams::new(state.page.page_name.clone())
            .with("action", "edit")
            .with("veswitched", "1");
        if state.page.restoring {
            if let Some(oldid) = state.page.revision_id {
                params.set("oldid", oldid.to_string());
            }
        }
        params
    }
}
