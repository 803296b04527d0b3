//! Save-request preparation and save-failure handling.

mod failure;
mod options;

pub use failure::{SaveErrorNotice, SaveFailureKind, classify_save_failure};
pub use options::{
    FIELD_CAPTCHA_ID, FIELD_CAPTCHA_WORD, FIELD_MINOR, FIELD_RECREATE, FIELD_SUMMARY,
    FIELD_WATCH, NegotiationContext, SaveDialogFields, SaveOptions, SaveOptionsNegotiator,
};
