//! Saving and save-failure recovery.

use super::{EditSessionController, active_session_mut};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wikiedit_core::document::{DocumentSnapshot, EditMode};
use wikiedit_core::error::{EditError, Result};
use wikiedit_core::history::PageParams;
use wikiedit_core::presentation::{
    Notification, PageContent, SaveDialogData, SaveDialogPanel, SaveDialogUpdate,
};
use wikiedit_core::remote::{
    ContentPayload, RemoteError, RemoteResult, SaveRequest, SaveResponse, UserIdentity,
};
use wikiedit_core::save::{
    NegotiationContext, SaveDialogFields, SaveErrorNotice, SaveFailureKind, SaveOptions,
    SaveOptionsNegotiator, classify_save_failure,
};
use wikiedit_core::session::{Lifecycle, OperationKind};

/// How a successful save left the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Content replaced in place and the editor closed.
    Saved { new_revision_id: Option<u64> },
    /// A new page or a restored revision; the host reloads the page.
    Navigated(PageParams),
}

enum AfterFailure {
    Retry,
    Stop,
}

impl EditSessionController {
    /// Opens the save dialog when there is something to save.
    ///
    /// Also starts preparing a cache key so the save itself is cheap.
    pub async fn open_save_dialog(&self, initial_panel: SaveDialogPanel) -> Result<bool> {
        let (snapshot, page, tokens, edit_token, data) = {
            let mut state = self.inner.state.write().await;
            let restoring = state.page.restoring;
            let page_exists = state.page.page_exists;
            let page = state.page.page_name.clone();
            let edit_token = state.page.edit_token.clone();
            let initial_summary = state.page.initial_edit_summary.clone().unwrap_or_default();
            let session = active_session_mut(&mut state, "open the save dialog")?;
            if !session.edited && !restoring {
                return Ok(false);
            }
            let data = SaveDialogData {
                save_button_label: save_button_label(
                    self.inner.host.preferences().publish_button_label,
                    page_exists,
                ),
                checkboxes: session.checkboxes.clone(),
                initial_summary,
                initial_panel,
            };
            (
                session.snapshot(),
                page,
                session.tokens().clone(),
                edit_token,
                data,
            )
        };

        if let Some(snapshot) = snapshot {
            self.inner
                .broker
                .prepare(&snapshot, &page, &tokens, edit_token.as_deref())
                .await;
        }
        track!("mwedit.saveIntent");
        self.inner.presentation.open_save_dialog(data);
        Ok(true)
    }

    /// Saves with the options entered in the save dialog.
    pub async fn save_from_dialog(&self, fields: SaveDialogFields) -> Result<SaveOutcome> {
        let context = {
            let mut state = self.inner.state.write().await;
            if state.lifecycle == Lifecycle::Deactivating {
                return Err(EditError::Aborted);
            }
            let initial_summary = state.page.initial_edit_summary.clone();
            let recreating = state.page.recreating;
            let session = active_session_mut(&mut state, "save")?;
            NegotiationContext {
                force_edit_summary: self.inner.host.preferences().force_edit_summary,
                initial_summary,
                summary_warning_shown: session.summary_warning_shown,
                captcha: session.captcha.take(),
                recreating,
            }
        };
        self.inner
            .presentation
            .update_save_dialog(SaveDialogUpdate::ClearCaptcha);

        let options = match SaveOptionsNegotiator::new(context).negotiate(&fields) {
            Ok(options) => options,
            Err(e) => {
                if e.is_validation() {
                    self.with_session_mut(|s| s.summary_warning_shown = true)
                        .await;
                    self.inner
                        .presentation
                        .update_save_dialog(SaveDialogUpdate::MissingSummary);
                    self.inner
                        .presentation
                        .update_save_dialog(SaveDialogUpdate::PopPending);
                }
                return Err(e);
            }
        };

        track!("mwedit.saveAttempt");
        self.save(options).await
    }

    /// Sends the live document to the server.
    ///
    /// A rejected edit token is refreshed and the save resubmitted once, as
    /// long as the session still belongs to the same account.
    ///
    /// # Arguments
    ///
    /// * `options` - Summary, watch and minor flags from the save dialog
    ///
    /// # Returns
    ///
    /// [`SaveOutcome::Navigated`] for a new page or a restored revision,
    /// otherwise [`SaveOutcome::Saved`] after the editor has closed.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::OperationInProgress`] while another save is in
    /// flight. Server rejections are returned after their notice has been
    /// shown in the save dialog.
    pub async fn save(&self, options: SaveOptions) -> Result<SaveOutcome> {
        let mut token_refreshed = false;
        loop {
            let (snapshot, base) = {
                let mut state = self.inner.state.write().await;
                let page = state.page.page_name.clone();
                let edit_token = state.page.edit_token.clone();
                let session = active_session_mut(&mut state, "save")?;
                let snapshot = session
                    .snapshot()
                    .ok_or_else(|| EditError::internal("no document to save"))?;
                session.pending.try_begin(OperationKind::Save)?;
                let base = SaveRequest {
                    page,
                    payload: ContentPayload::Html(Arc::clone(&snapshot.content)),
                    tokens: session.tokens().clone(),
                    edit_token,
                    section: session.section,
                    section_title: session.section_title.clone(),
                    options: options.clone(),
                };
                (snapshot, base)
            };
            self.inner
                .presentation
                .update_save_dialog(SaveDialogUpdate::PushPending);

            let start = Instant::now();
            let result = self
                .try_with_cache(&snapshot, "save", |payload| {
                    let request = SaveRequest {
                        payload,
                        ..base.clone()
                    };
                    self.inner.client.save(request, CancellationToken::new())
                })
                .await;
            self.finish_operation(OperationKind::Save).await;

            let error = match result {
                Ok(response) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    track!("mwedit.saveSuccess", duration_ms);
                    return self.save_complete(response).await;
                }
                Err(error) => error,
            };
            self.inner
                .presentation
                .update_save_dialog(SaveDialogUpdate::PopPending);

            match self.save_failed(&error, token_refreshed).await {
                AfterFailure::Retry => token_refreshed = true,
                AfterFailure::Stop => return Err(error.into()),
            }
        }
    }

    /// After a page-deleted warning: the next save recreates the page.
    pub async fn retry_after_warning(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;
        if !state.page.page_deleted_warning {
            return Ok(());
        }
        state.page.recreating = true;
        state.page.page_exists = false;
        state.page.page_deleted_warning = false;
        debug!("Continuing past page-deleted warning");
        Ok(())
    }

    /// Sends a request built from `snapshot`, preferring a prepared cache key.
    ///
    /// A stale key is retried once with the HTML inline. Any failure drops the
    /// prepared key.
    pub(super) async fn try_with_cache<T, F, Fut>(
        &self,
        snapshot: &DocumentSnapshot,
        event: &str,
        send: F,
    ) -> RemoteResult<T>
    where
        F: Fn(ContentPayload) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        if snapshot.mode == EditMode::Source {
            return send(ContentPayload::Wikitext(Arc::clone(&snapshot.content))).await;
        }

        let payload = self.inner.broker.consume(snapshot).await;
        let with_key = payload.is_cache_key();
        let start = Instant::now();
        let result = send(payload).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match &result {
            Ok(_) if with_key => Some("withCacheKey"),
            Ok(_) => Some("withoutCacheKey"),
            Err(e) if e.is_bad_cache_key() => Some("badCacheKey"),
            Err(_) => None,
        };
        if let Some(outcome) = outcome {
            let name = format!("performance.system.{event}.{outcome}");
            track!(name, duration_ms);
        }

        if let Err(error) = &result {
            self.inner.broker.invalidate().await;
            if with_key && error.is_bad_cache_key() {
                warn!(event, "Server rejected the cache key, resending content");
                return send(ContentPayload::Html(Arc::clone(&snapshot.content))).await;
            }
        }
        result
    }

    async fn save_failed(&self, error: &RemoteError, token_refreshed: bool) -> AfterFailure {
        // The warning only answers the failure that raised it.
        self.inner.state.write().await.page.page_deleted_warning = false;
        if error.is_aborted() {
            return AfterFailure::Stop;
        }
        let payload = error.save_payload();
        let kind = classify_save_failure(payload.as_ref());
        warn!(kind = kind.event_name(), error = %error, "Save failed");
        track!("mwedit.saveFailure", kind = kind.event_name());

        match &kind {
            SaveFailureKind::BadToken => return self.refresh_edit_token(token_refreshed).await,
            SaveFailureKind::EditConflict => self.inner.presentation.show_conflict(),
            SaveFailureKind::PageDeleted => {
                self.inner.state.write().await.page.page_deleted_warning = true;
            }
            SaveFailureKind::Captcha(challenge) => {
                self.with_session_mut(|s| s.captcha = Some(challenge.clone()))
                    .await;
                self.inner.presentation.show_captcha(challenge);
            }
            _ => {}
        }
        if let Some(notice) = kind.notice() {
            self.inner
                .presentation
                .update_save_dialog(SaveDialogUpdate::Error(notice));
        }
        AfterFailure::Stop
    }

    /// Fetches a fresh edit token and decides whether to resubmit.
    async fn refresh_edit_token(&self, already_refreshed: bool) -> AfterFailure {
        let kind = SaveFailureKind::BadToken.event_name();
        if already_refreshed {
            self.show_save_error(SaveErrorNotice::new(
                kind,
                "Your session data was lost. Please try saving again.",
            ));
            return AfterFailure::Stop;
        }

        let info = match self
            .inner
            .client
            .fetch_token_info(CancellationToken::new())
            .await
        {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Could not refresh the edit token");
                self.show_save_error(SaveErrorNotice::new(
                    kind,
                    "Could not renew your session. Try logging in again in another window, then save.",
                ));
                return AfterFailure::Stop;
            }
        };

        self.inner.state.write().await.page.edit_token = Some(info.edit_token);
        let previous = self.inner.host.user();
        if info.user.same_account(&previous) {
            debug!("Edit token refreshed, resubmitting");
            return AfterFailure::Retry;
        }

        info!(user = ?info.user, "Session now belongs to a different user");
        self.inner.host.set_user(info.user.clone());
        let message = match &info.user {
            UserIdentity::Anonymous => {
                "You are no longer logged in. Your edit will be attributed to your IP address if you save.".to_string()
            }
            UserIdentity::Registered { name, .. } => format!(
                "You are now logged in as {name}. Your edit will be attributed to this account if you save."
            ),
        };
        self.show_save_error(SaveErrorNotice::new("saveErrorNewUser", message));
        self.inner
            .presentation
            .notify(Notification::IdentityChanged { user: info.user });
        AfterFailure::Stop
    }

    async fn save_complete(&self, response: SaveResponse) -> Result<SaveOutcome> {
        let (page_name, page_exists, restoring) = {
            let mut state = self.inner.state.write().await;
            let before = (
                state.page.page_name.clone(),
                state.page.page_exists,
                state.page.restoring,
            );
            state.page.record_save(response.new_revision_id);
            if let Some(session) = state.session.as_mut() {
                session.edited = false;
            }
            before
        };

        if !page_exists || restoring {
            let notify = if restoring { "restored" } else { "created" };
            let mut target = PageParams::new(page_name).with("venotify", notify);
            if response.is_redirect {
                target.set("redirect", "no");
            }
            info!(notify, "Saved, reloading page");
            self.inner.presentation.set_unload_warning(None);
            self.inner.presentation.navigate(target.clone());
            return Ok(SaveOutcome::Navigated(target));
        }

        self.inner
            .presentation
            .update_save_dialog(SaveDialogUpdate::Reset);
        self.inner.presentation.replace_page_content(&PageContent {
            html: response.content,
            categories_html: response.categories_html,
            display_title_html: response.display_title_html,
            last_modified: response.last_modified,
            content_sub: response.content_sub,
            is_redirect: response.is_redirect,
        });
        self.deactivate(true, Some("save")).await?;

        if response.new_revision_id.is_some() {
            let message = if self.inner.host.preferences().publish_button_label {
                "Your edit was published."
            } else {
                "Your edit was saved."
            };
            self.inner.presentation.notify(Notification::Saved {
                message: message.to_string(),
            });
        }
        info!(revision = ?response.new_revision_id, "Saved");
        Ok(SaveOutcome::Saved {
            new_revision_id: response.new_revision_id,
        })
    }

    fn show_save_error(&self, notice: SaveErrorNotice) {
        self.inner
            .presentation
            .update_save_dialog(SaveDialogUpdate::Error(notice));
    }
}

fn save_button_label(publish: bool, page_exists: bool) -> String {
    match (publish, page_exists) {
        (true, true) => "Publish changes",
        (true, false) => "Publish page",
        (false, true) => "Save changes",
        (false, false) => "Save page",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_button_label() {
        assert_eq!(save_button_label(true, true), "Publish changes");
        assert_eq!(save_button_label(true, false), "Publish page");
        assert_eq!(save_button_label(false, true), "Save changes");
        assert_eq!(save_button_label(false, false), "Save page");
    }
}
