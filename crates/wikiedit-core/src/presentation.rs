//! Boundary to the UI the controller drives but does not own.
//!
//! Toolbar, dialogs and the page-content swap all sit behind
//! [`PresentationGateway`]. Implementations must never change lifecycle state
//! themselves; every transition goes through the controller.

use crate::document::{EditMode, Section};
use crate::history::PageParams;
use crate::remote::{CaptchaInfo, CheckboxDef, UserIdentity};
use crate::save::SaveErrorNotice;
use crate::session::ReviewContent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

/// What the presentation needs to know about the session being shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditContext {
    pub page_name: String,
    pub page_exists: bool,
    pub mode: EditMode,
    pub section: Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SaveDialogPanel {
    #[default]
    Save,
    Review,
    Preview,
    Conflict,
    NoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDialogData {
    pub save_button_label: String,
    pub checkboxes: Vec<CheckboxDef>,
    pub initial_summary: String,
    pub initial_panel: SaveDialogPanel,
}

/// Incremental changes pushed into an open save dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveDialogUpdate {
    PushPending,
    PopPending,
    Error(SaveErrorNotice),
    MissingSummary,
    ClearCaptcha,
    Review(ReviewContent),
    ClearReview,
    Reset,
}

/// Questions the controller asks the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmPrompt {
    /// Leave the editor and lose unsaved edits.
    DiscardChanges,
    /// Switching needs a full reload; edits cannot be kept.
    SwitchDiscardOnly,
    /// Changing section loses unsaved edits.
    UnsavedChanges,
}

impl ConfirmPrompt {
    pub fn message(&self) -> &'static str {
        match self {
            Self::DiscardChanges => "Are you sure you want to discard your changes?",
            Self::SwitchDiscardOnly => {
                "Switching editors is not possible inside a section. Discard your changes and reload the whole page?"
            }
            Self::UnsavedChanges => "You have unsaved changes. Leave anyway?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    pub message: String,
    /// Mode offered as a fallback, when one is available.
    pub fallback: Option<EditMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadRecovery {
    Retry,
    Abandon,
    FallBack(EditMode),
}

/// Rendered page parts returned by a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub html: String,
    pub categories_html: Option<String>,
    pub display_title_html: Option<String>,
    pub last_modified: Option<String>,
    pub content_sub: Option<String>,
    pub is_redirect: bool,
}

/// Classic edit-form post handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitForm {
    pub target: PageParams,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Saved { message: String },
    IdentityChanged { user: UserIdentity },
}

#[async_trait]
pub trait PresentationGateway: Send + Sync {
    /// Stashes the read-mode chrome and switches the page into edit mode.
    async fn enter_edit_mode(&self, context: &EditContext);

    /// Restores the stashed read-mode chrome.
    async fn exit_edit_mode(&self);

    /// Resolves once the toolbar is set up and visible.
    async fn show_toolbar(&self, mode: EditMode);

    async fn hide_toolbar(&self);

    /// Content and toolbar are both ready.
    fn surface_ready(&self, context: &EditContext);

    fn set_save_enabled(&self, enabled: bool);

    fn scroll_position(&self) -> u32;

    fn restore_scroll_position(&self, top: u32);

    fn open_save_dialog(&self, data: SaveDialogData);

    fn update_save_dialog(&self, update: SaveDialogUpdate);

    /// Closes the save dialog and any other modal sub-dialog.
    fn close_dialogs(&self);

    fn show_conflict(&self);

    fn show_captcha(&self, challenge: &CaptchaInfo);

    async fn confirm(&self, prompt: ConfirmPrompt) -> bool;

    async fn choose_load_recovery(&self, failure: &LoadFailure) -> LoadRecovery;

    fn replace_page_content(&self, content: &PageContent);

    /// Full page navigation. Leaves the editor.
    fn navigate(&self, target: PageParams);

    fn submit_form(&self, form: SubmitForm);

    fn notify(&self, notification: Notification);

    fn alert(&self, message: &str);

    /// `Some` installs a before-unload warning, `None` removes it.
    fn set_unload_warning(&self, message: Option<String>);

    /// Whether this presentation can offer the alternate mode after a failed load.
    fn offers_mode_fallback(&self) -> bool {
        true
    }
}
