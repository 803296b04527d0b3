//! Save flow: cache keys, failure recovery and post-save handling.

mod common;

use common::{Harness, HarnessBuilder, existing_page, harness, new_page, visual_html, visual_load};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;
use wikiedit_application::SaveOutcome;
use wikiedit_core::config::UserPreferences;
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::error::EditError;
use wikiedit_core::host::HostEnvironment;
use wikiedit_core::page_view::PageView;
use wikiedit_core::presentation::SaveDialogPanel;
use wikiedit_core::remote::{
    CacheKey, ContentPayload, DiffResponse, LoadResponse, RemoteError, SaveResponse, TokenInfo,
    UserIdentity,
};
use wikiedit_core::save::{SaveDialogFields, SaveOptions};
use wikiedit_core::session::{Lifecycle, OperationKind, ReviewContent};

fn saved(revision: u64) -> SaveResponse {
    SaveResponse {
        content: "<p>Saved</p>".to_string(),
        new_revision_id: Some(revision),
        ..Default::default()
    }
}

/// Activates on revision 100 and makes one edit.
async fn edited(h: &Harness) {
    h.client.push_load(Ok(visual_load(100)));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate");
    h.controller
        .update_document(visual_html(100, "<p>Changed</p>"))
        .await
        .expect("Should edit");
}

#[tokio::test]
async fn test_save_advances_revision_and_closes_editor() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_save(Ok(saved(101)));

    let outcome = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should save");

    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            new_revision_id: Some(101)
        }
    );
    assert_eq!(h.controller.revision_id().await, Some(101));
    assert_eq!(h.controller.lifecycle().await, Lifecycle::Inactive);
    assert_eq!(h.view.chrome().content_html, "<p>Saved</p>");
    assert_eq!(h.view.toasts(), vec!["Your edit was published."]);

    let saves = h.client.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].options.summary, "fix");
    assert_eq!(saves[0].edit_token.as_deref(), Some("token+\\"));
    assert_eq!(saves[0].tokens.revision_id, Some(100));
}

#[tokio::test]
async fn test_second_save_rejected_while_first_in_flight() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.hold_saves.store(true, Ordering::SeqCst);
    h.client.push_save(Ok(saved(101)));
    h.client
        .push_diff(Ok(DiffResponse::Diff("<tr>changed</tr>".to_string())));
    let options = SaveOptions {
        summary: "fix".to_string(),
        ..Default::default()
    };

    let controller = h.controller.clone();
    let first_options = options.clone();
    let first = tokio::spawn(async move { controller.save(first_options).await });
    while h.client.saves().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(h.controller.is_pending(OperationKind::Save).await);

    let err = h
        .controller
        .save(options)
        .await
        .expect_err("Should reject a second save");
    assert!(matches!(
        err,
        EditError::OperationInProgress(OperationKind::Save)
    ));
    assert_eq!(h.client.saves().len(), 1);

    // Other kinds are not blocked by the save.
    let diff = h
        .controller
        .request_diff()
        .await
        .expect("Should diff during the save");
    assert_eq!(diff, ReviewContent::Diff("<tr>changed</tr>".to_string()));
    assert_eq!(h.client.diffs().len(), 1);

    h.client.save_gate.notify_one();
    let outcome = first
        .await
        .expect("Should join save task")
        .expect("Should save");
    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            new_revision_id: Some(101)
        }
    );
    assert_eq!(h.client.saves().len(), 1);
}

#[tokio::test]
async fn test_open_save_dialog_needs_changes() {
    let h = harness(existing_page(100));
    h.client.push_load(Ok(visual_load(100)));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate");

    let opened = h
        .controller
        .open_save_dialog(SaveDialogPanel::Save)
        .await
        .unwrap();
    assert!(!opened);
    assert!(!h.presentation.dialog().open);
}

#[tokio::test]
async fn test_save_uses_prepared_cache_key() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_cache_key(Ok(CacheKey("key-1".to_string())));
    h.client.push_save(Ok(saved(101)));

    let opened = h
        .controller
        .open_save_dialog(SaveDialogPanel::Save)
        .await
        .expect("Should open");
    assert!(opened);
    let dialog = h.presentation.dialog();
    assert!(dialog.open);
    assert_eq!(
        dialog.data.map(|d| d.save_button_label).as_deref(),
        Some("Publish changes")
    );

    h.controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should save");
    let saves = h.client.saves();
    assert_eq!(
        saves[0].payload,
        ContentPayload::CacheKey(CacheKey("key-1".to_string()))
    );
    let prepared = h.client.prepare_requests.lock().unwrap().clone();
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared[0].edit_token.as_deref(), Some("token+\\"));
}

#[tokio::test]
async fn test_bad_cache_key_resends_html_once() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_cache_key(Ok(CacheKey("stale".to_string())));
    h.client
        .push_save(Err(RemoteError::server("badcachekey", None)));
    h.client.push_save(Ok(saved(101)));

    h.controller
        .open_save_dialog(SaveDialogPanel::Save)
        .await
        .expect("Should open");
    h.controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should save on the second send");

    let saves = h.client.saves();
    assert_eq!(saves.len(), 2);
    assert!(saves[0].payload.is_cache_key());
    assert!(matches!(saves[1].payload, ContentPayload::Html(_)));
}

#[tokio::test]
async fn test_edit_conflict_keeps_session() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client
        .push_save(Err(RemoteError::server("editconflict", None)));

    let err = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await
        .expect_err("Should report the conflict");

    assert!(err.is_conflict());
    assert_eq!(h.controller.lifecycle().await, Lifecycle::Active);
    assert!(!h.controller.is_pending(OperationKind::Save).await);
    assert!(h.controller.is_edited().await);
    let dialog = h.presentation.dialog();
    assert_eq!(dialog.panel, SaveDialogPanel::Conflict);
    assert!(!dialog.is_pending());
}

#[tokio::test]
async fn test_conflict_resolution_submits_classic_form() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client
        .push_save(Err(RemoteError::server("editconflict", None)));
    h.client.push_serialize("Changed wikitext");

    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    h.controller
        .resolve_conflict(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should submit");

    let submissions = h.view.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].action_url.contains("action=submit"));
    let fields = &submissions[0].fields;
    assert_eq!(fields["wpSave"], "1");
    assert_eq!(fields["wpSummary"], "fix");
    assert_eq!(fields["wpTextbox1"], "Changed wikitext");
    assert_eq!(fields["oldid"], "100");
    assert!(h.controller.is_pending(OperationKind::Submit).await);
    assert_eq!(h.view.unload_warning(), None);
}

#[tokio::test]
async fn test_conflict_form_uses_reloaded_revision() {
    let h = harness(existing_page(100));
    h.client.push_load(Ok(LoadResponse {
        revision_id: Some(101),
        ..visual_load(100)
    }));
    h.client.push_load(Ok(visual_load(101)));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate after one reload");
    h.controller
        .update_document(visual_html(101, "<p>Changed</p>"))
        .await
        .expect("Should edit");
    h.client
        .push_save(Err(RemoteError::server("editconflict", None)));
    h.client.push_serialize("Changed wikitext");

    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    assert_eq!(h.client.saves()[0].tokens.revision_id, Some(101));
    h.controller
        .resolve_conflict(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should submit");

    let submissions = h.view.submissions();
    assert_eq!(submissions[0].fields["oldid"], "101");
}

#[tokio::test]
async fn test_bad_token_same_user_resubmits() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_save(Err(RemoteError::server("badtoken", None)));
    h.client.push_token(Ok(TokenInfo {
        edit_token: "fresh+\\".to_string(),
        user: UserIdentity::Anonymous,
    }));
    h.client.push_save(Ok(saved(101)));

    let outcome = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should save after refreshing the token");
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));

    let saves = h.client.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].edit_token.as_deref(), Some("fresh+\\"));
}

#[tokio::test]
async fn test_bad_token_new_user_stops() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_save(Err(RemoteError::server("badtoken", None)));
    h.client.push_token(Ok(TokenInfo {
        edit_token: "fresh+\\".to_string(),
        user: UserIdentity::Registered {
            id: 7,
            name: "Other".to_string(),
        },
    }));

    let result = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    assert!(result.is_err());

    assert_eq!(h.client.saves().len(), 1);
    assert_eq!(h.host.user().name(), Some("Other"));
    assert_eq!(h.view.toasts(), vec!["You are now logged in as Other."]);
    let dialog = h.presentation.dialog();
    assert_eq!(
        dialog.messages.last().map(|m| m.kind.as_str()),
        Some("saveErrorNewUser")
    );
    assert_eq!(h.controller.lifecycle().await, Lifecycle::Active);
}

#[tokio::test]
async fn test_bad_token_twice_gives_up() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_save(Err(RemoteError::server("badtoken", None)));
    h.client.push_token(Ok(TokenInfo {
        edit_token: "fresh+\\".to_string(),
        user: UserIdentity::Anonymous,
    }));
    h.client.push_save(Err(RemoteError::server("badtoken", None)));

    let result = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    assert!(result.is_err());
    assert_eq!(h.client.saves().len(), 2);
    assert_eq!(*h.client.token_requests.lock().unwrap(), 1);
    let dialog = h.presentation.dialog();
    assert_eq!(
        dialog.messages.last().map(|m| m.kind.as_str()),
        Some("saveErrorBadToken")
    );
}

#[tokio::test]
async fn test_missing_summary_warns_once() {
    let h = HarnessBuilder::new(existing_page(100))
        .preferences(UserPreferences {
            force_edit_summary: true,
            ..Default::default()
        })
        .build();
    edited(&h).await;
    h.client.push_save(Ok(saved(101)));

    let err = h
        .controller
        .save_from_dialog(SaveDialogFields::default())
        .await
        .expect_err("Should ask for a summary");
    assert!(err.is_validation());
    assert!(h.client.saves().is_empty());
    assert!(h.presentation.dialog().missing_summary);

    h.controller
        .save_from_dialog(SaveDialogFields::default())
        .await
        .expect("Should save once the warning was shown");
    assert_eq!(h.client.saves().len(), 1);
}

#[tokio::test]
async fn test_new_page_save_navigates() {
    let h = harness(new_page());
    h.client.push_load(Ok(LoadResponse {
        content: visual_html(0, ""),
        ..Default::default()
    }));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate");
    h.controller
        .update_document(visual_html(0, "<p>First</p>"))
        .await
        .unwrap();
    h.client.push_save(Ok(saved(5)));

    let outcome = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("new"))
        .await
        .expect("Should save");

    let SaveOutcome::Navigated(target) = outcome else {
        panic!("Expected navigation, got {outcome:?}");
    };
    assert_eq!(target.get("venotify"), Some("created"));
    assert!(
        h.view
            .navigations()
            .last()
            .is_some_and(|url| url.contains("venotify=created"))
    );
    assert_eq!(h.view.unload_warning(), None);
}

#[tokio::test]
async fn test_page_deleted_then_recreate() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client
        .push_save(Err(RemoteError::server("pagedeleted", None)));
    h.client.push_save(Ok(saved(102)));

    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    let page = h.controller.page_state().await;
    assert!(page.page_deleted_warning);
    assert!(
        h.presentation
            .dialog()
            .messages
            .iter()
            .any(|m| m.kind == "saveErrorPageDeleted" && m.warning)
    );

    h.controller.retry_after_warning().await.unwrap();
    let page = h.controller.page_state().await;
    assert!(page.recreating);
    assert!(!page.page_exists);

    let outcome = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await
        .expect("Should recreate");
    assert!(matches!(outcome, SaveOutcome::Navigated(_)));
    assert!(h.client.saves()[1].options.recreate);
}

#[tokio::test]
async fn test_later_failure_clears_page_deleted_warning() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client
        .push_save(Err(RemoteError::server("pagedeleted", None)));
    h.client.push_save(Err(RemoteError::server("readonly", None)));

    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    assert!(h.controller.page_state().await.page_deleted_warning);
    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    assert!(!h.controller.page_state().await.page_deleted_warning);

    h.controller.retry_after_warning().await.unwrap();
    let page = h.controller.page_state().await;
    assert!(!page.recreating);
    assert!(page.page_exists);
}

#[tokio::test]
async fn test_captcha_answer_is_sent_with_next_save() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_save(Err(RemoteError::with_payload(
        "captcha",
        None,
        json!({
            "visualeditoredit": {
                "edit": {
                    "captcha": { "id": "c1", "type": "image", "url": "/captcha.png" }
                }
            }
        }),
    )));
    h.client.push_save(Ok(saved(101)));

    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    let challenge = h.presentation.dialog().captcha.expect("Should show captcha");
    assert_eq!(challenge.id.as_deref(), Some("c1"));

    let mut fields = SaveDialogFields::with_summary("fix");
    fields.captcha_word = Some("answer".to_string());
    h.controller
        .save_from_dialog(fields)
        .await
        .expect("Should save with the captcha answer");

    let saves = h.client.saves();
    assert_eq!(saves[1].options.captcha_id.as_deref(), Some("c1"));
    assert_eq!(saves[1].options.captcha_word.as_deref(), Some("answer"));
}

#[tokio::test]
async fn test_unknown_error_is_unrecoverable() {
    let h = harness(existing_page(100));
    edited(&h).await;
    h.client.push_save(Err(RemoteError::server(
        "internal_api_error",
        Some("boom".to_string()),
    )));

    let _ = h
        .controller
        .save_from_dialog(SaveDialogFields::with_summary("fix"))
        .await;
    assert!(h.presentation.dialog().has_unrecoverable_error());
    assert!(!h.controller.is_pending(OperationKind::Save).await);
}
