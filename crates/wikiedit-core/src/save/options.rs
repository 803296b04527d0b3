//! Save-dialog field state to save-request parameters.
//!
//! Nothing here touches the network: a missing mandatory summary is rejected
//! before any request is built.

use crate::error::{EditError, Result};
use crate::remote::CaptchaInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FIELD_SUMMARY: &str = "wpSummary";
pub const FIELD_MINOR: &str = "wpMinoredit";
pub const FIELD_WATCH: &str = "wpWatchthis";
pub const FIELD_CAPTCHA_ID: &str = "wpCaptchaId";
pub const FIELD_CAPTCHA_WORD: &str = "wpCaptchaWord";
pub const FIELD_RECREATE: &str = "wpRecreate";

/// What the user has entered in the save dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDialogFields {
    pub summary: String,
    /// Selected checkboxes, by form name, with their submitted value.
    pub checkboxes: BTreeMap<String, String>,
    /// Any other form inputs that came with the checkbox definitions.
    pub other_fields: BTreeMap<String, String>,
    pub captcha_word: Option<String>,
}

impl SaveDialogFields {
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn check(mut self, name: impl Into<String>) -> Self {
        self.checkboxes.insert(name.into(), "1".to_string());
        self
    }
}

/// Session facts the negotiator needs beside the dialog fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationContext {
    pub force_edit_summary: bool,
    pub initial_summary: Option<String>,
    /// The missing-summary warning has already been shown once.
    pub summary_warning_shown: bool,
    pub captcha: Option<CaptchaInfo>,
    /// User continued past a page-deleted warning.
    pub recreating: bool,
}

/// Parameters attached to a save request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    pub summary: String,
    pub minor: bool,
    pub watch: bool,
    pub captcha_id: Option<String>,
    pub captcha_word: Option<String>,
    pub recreate: bool,
    /// Unrecognised fields, passed through unchanged.
    pub extra: BTreeMap<String, String>,
}

impl SaveOptions {
    /// API parameter list in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("summary".to_string(), self.summary.clone())];
        if self.minor {
            params.push(("minor".to_string(), "1".to_string()));
        }
        if self.watch {
            params.push(("watch".to_string(), "1".to_string()));
        }
        if let Some(id) = &self.captcha_id {
            params.push(("captchaid".to_string(), id.clone()));
        }
        if let Some(word) = &self.captcha_word {
            params.push(("captchaword".to_string(), word.clone()));
        }
        if self.recreate {
            params.push(("recreate".to_string(), "1".to_string()));
        }
        params.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

#[derive(Debug, Clone)]
pub struct SaveOptionsNegotiator {
    context: NegotiationContext,
}

impl SaveOptionsNegotiator {
    pub fn new(context: NegotiationContext) -> Self {
        Self { context }
    }

    /// Classic edit-form fields (`wp*` names), as posted by a form submit.
    pub fn save_fields(&self, dialog: &SaveDialogFields) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_SUMMARY.to_string(), dialog.summary.clone());

        if let Some(captcha) = &self.context.captcha {
            if let Some(id) = &captcha.id {
                fields.insert(FIELD_CAPTCHA_ID.to_string(), id.clone());
            }
            if let Some(word) = &dialog.captcha_word {
                fields.insert(FIELD_CAPTCHA_WORD.to_string(), word.clone());
            }
        }
        if self.context.recreating {
            fields.insert(FIELD_RECREATE.to_string(), "1".to_string());
        }
        for (name, value) in dialog.checkboxes.iter().chain(dialog.other_fields.iter()) {
            if !name.is_empty() {
                fields.insert(name.clone(), value.clone());
            }
        }
        fields
    }

    /// Rejects a save whose mandatory summary is missing or untouched.
    ///
    /// Only the first attempt is rejected; once the warning has been shown
    /// the user may save anyway.
    pub fn check_summary(&self, summary: &str) -> Result<()> {
        if !self.context.force_edit_summary || self.context.summary_warning_shown {
            return Ok(());
        }
        let unchanged = self.context.initial_summary.as_deref() == Some(summary);
        if summary.is_empty() || unchanged {
            return Err(EditError::validation("missingsummary"));
        }
        Ok(())
    }

    /// Validates and maps dialog fields to API save options.
    pub fn negotiate(&self, dialog: &SaveDialogFields) -> Result<SaveOptions> {
        self.check_summary(&dialog.summary)?;

        let mut options = SaveOptions::default();
        for (name, value) in self.save_fields(dialog) {
            match name.as_str() {
                FIELD_SUMMARY => options.summary = value,
                FIELD_MINOR => options.minor = true,
                FIELD_WATCH => options.watch = true,
                FIELD_CAPTCHA_ID => options.captcha_id = Some(value),
                FIELD_CAPTCHA_WORD => options.captcha_word = Some(value),
                FIELD_RECREATE => options.recreate = true,
                _ => {
                    options.extra.insert(name, value);
                }
            }
        }
        Ok(options)
    }
}
