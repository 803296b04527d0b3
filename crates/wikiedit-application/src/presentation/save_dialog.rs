use serde::{Deserialize, Serialize};
use wikiedit_core::presentation::{SaveDialogData, SaveDialogPanel, SaveDialogUpdate};
use wikiedit_core::remote::CaptchaInfo;
use wikiedit_core::save::SaveErrorNotice;
use wikiedit_core::session::ReviewContent;

/// State of the save dialog as the user sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDialogModel {
    pub open: bool,
    pub panel: SaveDialogPanel,
    pub data: Option<SaveDialogData>,
    /// Outstanding requests; the dialog shows a spinner while non-zero.
    pub pending: u32,
    pub messages: Vec<SaveErrorNotice>,
    pub missing_summary: bool,
    pub review: Option<ReviewContent>,
    pub captcha: Option<CaptchaInfo>,
    pub save_enabled: bool,
}

impl SaveDialogModel {
    pub fn open(&mut self, data: SaveDialogData) {
        self.open = true;
        self.panel = data.initial_panel;
        self.data = Some(data);
        self.messages.clear();
        self.missing_summary = false;
    }

    pub fn apply(&mut self, update: SaveDialogUpdate) {
        match update {
            SaveDialogUpdate::PushPending => self.pending += 1,
            SaveDialogUpdate::PopPending => self.pending = self.pending.saturating_sub(1),
            SaveDialogUpdate::Error(notice) => self.messages.push(notice),
            SaveDialogUpdate::MissingSummary => self.missing_summary = true,
            SaveDialogUpdate::ClearCaptcha => self.captcha = None,
            SaveDialogUpdate::Review(content) => {
                self.panel = match content {
                    ReviewContent::NoChanges => SaveDialogPanel::NoChanges,
                    _ => SaveDialogPanel::Review,
                };
                self.review = Some(content);
            }
            SaveDialogUpdate::ClearReview => {
                self.review = None;
                if matches!(
                    self.panel,
                    SaveDialogPanel::Review | SaveDialogPanel::NoChanges
                ) {
                    self.panel = SaveDialogPanel::Save;
                }
            }
            SaveDialogUpdate::Reset => {
                self.pending = 0;
                self.messages.clear();
                self.missing_summary = false;
                self.review = None;
                self.captcha = None;
                self.panel = SaveDialogPanel::Save;
            }
        }
    }

    pub fn show_conflict(&mut self) {
        self.open = true;
        self.panel = SaveDialogPanel::Conflict;
    }

    pub fn show_captcha(&mut self, challenge: CaptchaInfo) {
        self.captcha = Some(challenge);
    }

    /// Closes the dialog. Review output and messages do not survive.
    pub fn close(&mut self) {
        let save_enabled = self.save_enabled;
        *self = Self {
            save_enabled,
            ..Self::default()
        };
    }

    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    /// An error blocks saving until the user edits again.
    pub fn has_unrecoverable_error(&self) -> bool {
        self.messages.iter().any(|m| !m.recoverable)
    }
}
