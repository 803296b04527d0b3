mod common;

use common::{existing_page, harness, new_page, visual_html, visual_load};
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::presentation::SaveDialogPanel;
use wikiedit_core::remote::{DiffResponse, LoadResponse, RemoteError};
use wikiedit_core::session::{OperationKind, ReviewContent};

#[tokio::test]
async fn test_diff_cached_until_next_edit() {
    let h = harness(existing_page(100));
    h.client.push_load(Ok(visual_load(100)));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate");
    h.controller
        .update_document(visual_html(100, "<p>One</p>"))
        .await
        .unwrap();
    h.client
        .push_diff(Ok(DiffResponse::Diff("<tr>one</tr>".to_string())));
    h.client.push_diff(Ok(DiffResponse::NoChanges));

    let first = h.controller.request_diff().await.expect("Should diff");
    let again = h.controller.request_diff().await.expect("Should hit cache");
    assert_eq!(first, ReviewContent::Diff("<tr>one</tr>".to_string()));
    assert_eq!(again, first);
    assert_eq!(h.client.diffs().len(), 1);
    assert_eq!(h.client.diffs()[0].edit_token.as_deref(), Some("token+\\"));

    h.controller
        .update_document(visual_html(100, "<p>Hello</p>"))
        .await
        .unwrap();
    let after_edit = h.controller.request_diff().await.expect("Should diff");
    assert_eq!(after_edit, ReviewContent::NoChanges);
    assert_eq!(h.client.diffs().len(), 2);
}

#[tokio::test]
async fn test_review_fills_dialog() {
    let h = harness(existing_page(100));
    h.client.push_load(Ok(visual_load(100)));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate");
    h.controller
        .update_document(visual_html(100, "<p>One</p>"))
        .await
        .unwrap();
    h.client
        .push_diff(Ok(DiffResponse::Diff("<tr>one</tr>".to_string())));

    h.controller.review().await.expect("Should review");
    let dialog = h.presentation.dialog();
    assert_eq!(dialog.panel, SaveDialogPanel::Review);
    assert_eq!(
        dialog.review,
        Some(ReviewContent::Diff("<tr>one</tr>".to_string()))
    );
    assert!(!dialog.is_pending());

    // A further edit invalidates the shown review.
    h.controller
        .update_document(visual_html(100, "<p>Two</p>"))
        .await
        .unwrap();
    let dialog = h.presentation.dialog();
    assert_eq!(dialog.review, None);
    assert_eq!(dialog.panel, SaveDialogPanel::Save);
}

#[tokio::test]
async fn test_new_page_review_shows_wikitext() {
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
    h.client.push_serialize("First");

    let review = h.controller.review().await.expect("Should review");
    assert_eq!(review, ReviewContent::Wikitext("First".to_string()));
    // Second review comes from the cache.
    let again = h.controller.review().await.expect("Should review");
    assert_eq!(again, review);
    let serialized = h.client.serialize_requests.lock().unwrap().clone();
    assert_eq!(serialized.len(), 1);
    assert_eq!(serialized[0].edit_token.as_deref(), Some("token+\\"));
    assert!(h.client.diffs().is_empty());
}

#[tokio::test]
async fn test_diff_failure_alerts_and_releases_guard() {
    let h = harness(existing_page(100));
    h.client.push_load(Ok(visual_load(100)));
    h.controller
        .activate(EditMode::Visual, Section::Whole)
        .await
        .expect("Should activate");
    h.client
        .push_diff(Err(RemoteError::network("connection reset")));

    assert!(h.controller.request_diff().await.is_err());
    assert_eq!(h.view.alerts().len(), 1);
    assert!(!h.controller.is_pending(OperationKind::Diff).await);
}
