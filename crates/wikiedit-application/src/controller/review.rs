//! Diff, serialization and the classic-form hand-off.

use super::{EditSessionController, active_session, active_session_mut};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wikiedit_core::document::EditMode;
use wikiedit_core::error::{EditError, Result};
use wikiedit_core::history::PageParams;
use wikiedit_core::presentation::{SaveDialogUpdate, SubmitForm};
use wikiedit_core::remote::{ContentPayload, DiffRequest, DiffResponse, SerializeRequest};
use wikiedit_core::save::{NegotiationContext, SaveDialogFields, SaveOptionsNegotiator};
use wikiedit_core::session::{OperationKind, ReviewContent};

impl EditSessionController {
    /// Diff of the live document against the base revision.
    ///
    /// Cached per snapshot: asking again without an edit in between makes no
    /// request.
    pub async fn request_diff(&self) -> Result<ReviewContent> {
        let (snapshot, request) = {
            let mut state = self.inner.state.write().await;
            let page = state.page.page_name.clone();
            let edit_token = state.page.edit_token.clone();
            let session = active_session_mut(&mut state, "diff")?;
            if let Some(cached) = session.cached_review() {
                debug!("Serving diff from cache");
                return Ok(cached.clone());
            }
            let snapshot = session
                .snapshot()
                .ok_or_else(|| EditError::internal("no document to diff"))?;
            session.pending.try_begin(OperationKind::Diff)?;
            let request = DiffRequest {
                page,
                payload: ContentPayload::Html(snapshot.content.clone()),
                tokens: session.tokens().clone(),
                edit_token,
                section: session.section,
            };
            (snapshot, request)
        };

        let result = self
            .try_with_cache(&snapshot, "diff", |payload| {
                let request = DiffRequest {
                    payload,
                    ..request.clone()
                };
                self.inner.client.diff(request, CancellationToken::new())
            })
            .await;
        self.finish_operation(OperationKind::Diff).await;

        match result {
            Ok(response) => {
                let content = match response {
                    DiffResponse::Diff(html) => ReviewContent::Diff(html),
                    DiffResponse::NoChanges => ReviewContent::NoChanges,
                };
                self.with_session_mut(|s| s.cache_review(snapshot.id, content.clone()))
                    .await;
                Ok(content)
            }
            Err(e) => {
                if !e.is_aborted() {
                    warn!(error = %e, "Diff failed");
                    self.inner.presentation.alert(&format!(
                        "Could not retrieve a response from the server: {e}"
                    ));
                }
                Err(e.into())
            }
        }
    }

    /// Wikitext of the live document.
    ///
    /// Source-mode documents already are wikitext and need no request.
    pub async fn request_serialize(&self) -> Result<String> {
        let (snapshot, request) = {
            let mut state = self.inner.state.write().await;
            let page = state.page.page_name.clone();
            let edit_token = state.page.edit_token.clone();
            let session = active_session_mut(&mut state, "serialize")?;
            let snapshot = session
                .snapshot()
                .ok_or_else(|| EditError::internal("no document to serialize"))?;
            if snapshot.mode == EditMode::Source {
                return Ok(snapshot.content.to_string());
            }
            session.pending.try_begin(OperationKind::Serialize)?;
            let request = SerializeRequest {
                page,
                payload: ContentPayload::Html(snapshot.content.clone()),
                tokens: session.tokens().clone(),
                edit_token,
            };
            (snapshot, request)
        };

        let result = self
            .try_with_cache(&snapshot, "serialize", |payload| {
                let request = SerializeRequest {
                    payload,
                    ..request.clone()
                };
                self.inner.client.serialize(request, CancellationToken::new())
            })
            .await;
        self.finish_operation(OperationKind::Serialize).await;

        result.map(|r| r.wikitext).map_err(|e| {
            if !e.is_aborted() {
                warn!(error = %e, "Serialization failed");
                self.inner.presentation.alert(&format!(
                    "Could not convert the document to wikitext: {e}"
                ));
            }
            e.into()
        })
    }

    /// Fills the save dialog's review panel.
    ///
    /// Existing pages show a diff; new pages show the wikitext to be created.
    pub async fn review(&self) -> Result<ReviewContent> {
        let page_exists = self.inner.state.read().await.page.page_exists;
        self.inner
            .presentation
            .update_save_dialog(SaveDialogUpdate::PushPending);

        let result = if page_exists {
            self.request_diff().await
        } else {
            self.review_new_page().await
        };
        self.inner
            .presentation
            .update_save_dialog(SaveDialogUpdate::PopPending);

        let content = result?;
        self.inner
            .presentation
            .update_save_dialog(SaveDialogUpdate::Review(content.clone()));
        track!("mwedit.review", kind = review_kind(&content));
        Ok(content)
    }

    async fn review_new_page(&self) -> Result<ReviewContent> {
        let (cached, snapshot) = {
            let state = self.inner.state.read().await;
            let session = active_session(&state, "review")?;
            (session.cached_review().cloned(), session.snapshot_id())
        };
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let content = ReviewContent::Wikitext(self.request_serialize().await?);
        if let Some(snapshot) = snapshot {
            self.with_session_mut(|s| s.cache_review(snapshot, content.clone()))
                .await;
        }
        Ok(content)
    }

    /// Hands an edit conflict to the classic form's merge view.
    pub async fn resolve_conflict(&self, fields: SaveDialogFields) -> Result<()> {
        let context = {
            let state = self.inner.state.read().await;
            let session = active_session(&state, "resolve a conflict")?;
            NegotiationContext {
                captcha: session.captcha.clone(),
                recreating: state.page.recreating,
                ..Default::default()
            }
        };
        let wikitext = self.request_serialize().await?;
        let mut form_fields = SaveOptionsNegotiator::new(context).save_fields(&fields);
        form_fields.insert("wpSave".to_string(), "1".to_string());
        self.submit(wikitext, form_fields).await
    }

    /// Posts `wikitext` to the classic edit form, leaving the editor.
    ///
    /// The guard is never released: the page navigates away.
    pub async fn submit(&self, wikitext: String, fields: BTreeMap<String, String>) -> Result<()> {
        let form = {
            let mut state = self.inner.state.write().await;
            let page = state.page.clone();
            let session = active_session_mut(&mut state, "submit")?;
            session.pending.try_begin(OperationKind::Submit)?;
            let tokens = session.tokens();

            let mut form_fields = BTreeMap::from([
                ("format".to_string(), "text/x-wiki".to_string()),
                ("model".to_string(), "wikitext".to_string()),
                (
                    "oldid".to_string(),
                    page.revision_id.unwrap_or_default().to_string(),
                ),
                (
                    "wpStarttime".to_string(),
                    tokens.start_timestamp.clone().unwrap_or_default(),
                ),
                (
                    "wpEdittime".to_string(),
                    tokens.base_timestamp.clone().unwrap_or_default(),
                ),
                ("wpTextbox1".to_string(), wikitext),
                (
                    "wpEditToken".to_string(),
                    page.edit_token.clone().unwrap_or_default(),
                ),
            ]);
            form_fields.extend(fields);
            SubmitForm {
                target: PageParams::new(page.page_name).with("action", "submit"),
                fields: form_fields,
            }
        };

        self.inner.presentation.set_unload_warning(None);
        track!("mwedit.submit");
        self.inner.presentation.submit_form(form);
        Ok(())
    }
}

fn review_kind(content: &ReviewContent) -> &'static str {
    match content {
        ReviewContent::Diff(_) => "diff",
        ReviewContent::NoChanges => "nochanges",
        ReviewContent::Wikitext(_) => "wikitext",
    }
}
