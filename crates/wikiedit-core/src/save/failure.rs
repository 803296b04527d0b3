//! Save-failure classification.
//!
//! The check order matters: several upstream extensions report through the
//! same envelope, and captcha challenges are recognised by shape rather than
//! by an error code.

use crate::remote::{CaptchaInfo, SaveErrorPayload};
use serde::{Deserialize, Serialize};

const ABUSE_FILTER_PREFIX: &str = "Hit AbuseFilter:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFailureKind {
    Empty,
    SpamBlacklist { message_html: Option<String> },
    AbuseFilter { warning_html: String },
    BadToken,
    EditConflict,
    PageDeleted,
    TitleBlacklist,
    ReadOnly { reason: Option<String> },
    Captcha(CaptchaInfo),
    Unknown {
        code: Option<String>,
        message: Option<String>,
    },
}

/// Error shown in the save dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveErrorNotice {
    /// Event name, e.g. `saveErrorReadOnly`.
    pub kind: String,
    pub message: String,
    /// The user may press save again.
    pub recoverable: bool,
    pub warning: bool,
}

impl SaveErrorNotice {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            recoverable: true,
            warning: false,
        }
    }

    pub fn unrecoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }

    pub fn as_warning(mut self) -> Self {
        self.warning = true;
        self
    }
}

pub fn classify_save_failure(payload: Option<&SaveErrorPayload>) -> SaveFailureKind {
    let Some(payload) = payload else {
        return SaveFailureKind::Empty;
    };
    let edit = payload.edit.as_ref();

    if let Some(edit) = edit.filter(|e| e.spamblacklist.is_some()) {
        return SaveFailureKind::SpamBlacklist {
            message_html: edit.sberrorparsed.clone(),
        };
    }

    if let Some(edit) = edit {
        let hit_filter = edit
            .info
            .as_deref()
            .is_some_and(|info| info.starts_with(ABUSE_FILTER_PREFIX));
        if let (true, Some(warning)) = (hit_filter, &edit.warning) {
            return SaveFailureKind::AbuseFilter {
                warning_html: warning.clone(),
            };
        }
    }

    if let Some(error) = &payload.error {
        match error.code.as_str() {
            "badtoken" => return SaveFailureKind::BadToken,
            "editconflict" => return SaveFailureKind::EditConflict,
            "pagedeleted" => return SaveFailureKind::PageDeleted,
            "titleblacklist-forbidden" => return SaveFailureKind::TitleBlacklist,
            "readonly" => {
                return SaveFailureKind::ReadOnly {
                    reason: error.readonlyreason.clone(),
                };
            }
            _ => {}
        }
    }

    if let Some(captcha) = edit.and_then(|e| e.captcha.as_ref()) {
        let by_kind = matches!(
            captcha.kind.as_deref(),
            Some("simple") | Some("math") | Some("question")
        );
        if captcha.url.is_some() || by_kind {
            return SaveFailureKind::Captcha(captcha.clone());
        }
    }

    SaveFailureKind::Unknown {
        code: edit
            .and_then(|e| e.code.clone())
            .or_else(|| payload.error.as_ref().map(|e| e.code.clone())),
        message: edit
            .and_then(|e| e.info.clone())
            .or_else(|| payload.error.as_ref().and_then(|e| e.info.clone())),
    }
}

impl SaveFailureKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Empty => "saveErrorEmpty",
            Self::SpamBlacklist { .. } => "saveErrorSpamBlacklist",
            Self::AbuseFilter { .. } => "saveErrorAbuseFilter",
            Self::BadToken => "saveErrorBadToken",
            Self::EditConflict => "editConflict",
            Self::PageDeleted => "saveErrorPageDeleted",
            Self::TitleBlacklist => "saveErrorTitleBlacklist",
            Self::ReadOnly { .. } => "saveErrorReadOnly",
            Self::Captcha(_) => "saveErrorCaptcha",
            Self::Unknown { .. } => "saveErrorUnknown",
        }
    }

    /// Dialog notice for the kinds that are reported as a plain error.
    ///
    /// Bad token, conflict and captcha have their own flows and return `None`.
    pub fn notice(&self) -> Option<SaveErrorNotice> {
        let name = self.event_name();
        let notice = match self {
            Self::Empty => {
                SaveErrorNotice::new(name, "Error saving data to server: Empty server response")
                    .unrecoverable()
            }
            Self::SpamBlacklist { message_html } => SaveErrorNotice::new(
                name,
                message_html
                    .clone()
                    .unwrap_or_else(|| "The edit was blocked by the spam filter.".to_string()),
            )
            .unrecoverable(),
            Self::AbuseFilter { warning_html } => SaveErrorNotice::new(name, warning_html.clone()),
            Self::PageDeleted => SaveErrorNotice::new(
                name,
                "This page has been deleted since you started editing. Press \"Continue\" to recreate it.",
            )
            .as_warning(),
            Self::TitleBlacklist => {
                SaveErrorNotice::new(name, "The title of this page has been blacklisted.")
            }
            Self::ReadOnly { reason } => SaveErrorNotice::new(
                name,
                format!(
                    "The database is locked: {}",
                    reason.as_deref().unwrap_or("no reason given")
                ),
            )
            .as_warning(),
            Self::Unknown { code, message } => SaveErrorNotice::new(
                name,
                message
                    .clone()
                    .or_else(|| code.clone())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
            .unrecoverable(),
            Self::BadToken | Self::EditConflict | Self::Captcha(_) => return None,
        };
        Some(notice)
    }
}
