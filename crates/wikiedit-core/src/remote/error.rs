use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Code the API uses for an expired or unknown cache key.
pub const BAD_CACHE_KEY: &str = "badcachekey";

/// Failure of a single remote call.
///
/// `Clone` so one prepared-cache-key outcome can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("network error: {message}")]
    Network { message: String },

    /// Structured API failure. `payload` is the raw response body, kept so
    /// save-failure classification can inspect its shape.
    #[error("server error: {code}")]
    Server {
        code: String,
        info: Option<String>,
        payload: Option<Value>,
    },

    #[error("request aborted")]
    Aborted,
}

impl RemoteError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Server error with a minimal `{"error": {code, info}}` payload.
    pub fn server(code: impl Into<String>, info: Option<String>) -> Self {
        let code = code.into();
        let payload = json!({ "error": { "code": code, "info": info } });
        Self::Server {
            code,
            info,
            payload: Some(payload),
        }
    }

    /// Server error carrying the full response body.
    pub fn with_payload(code: impl Into<String>, info: Option<String>, payload: Value) -> Self {
        Self::Server {
            code: code.into(),
            info,
            payload: Some(payload),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn is_bad_cache_key(&self) -> bool {
        self.code() == Some(BAD_CACHE_KEY)
    }

    /// Save-error view of the payload. `None` when there is no body at all.
    pub fn save_payload(&self) -> Option<SaveErrorPayload> {
        match self {
            Self::Server {
                payload: Some(payload),
                ..
            } => serde_json::from_value(payload.clone()).ok(),
            Self::Server { code, info, .. } => Some(SaveErrorPayload {
                error: Some(ApiErrorInfo {
                    code: code.clone(),
                    info: info.clone(),
                    readonlyreason: None,
                }),
                edit: None,
            }),
            _ => None,
        }
    }
}

/// Body of a failed save, shaped like the `visualeditoredit` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorInfo>,
    #[serde(
        default,
        rename = "visualeditoredit",
        with = "edit_envelope",
        skip_serializing_if = "Option::is_none"
    )]
    pub edit: Option<EditApiInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorInfo {
    pub code: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub readonlyreason: Option<String>,
}

/// The nested `edit` object reported by the underlying edit API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditApiInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spamblacklist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sberrorparsed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha: Option<CaptchaInfo>,
}

/// ConfirmEdit challenge. Which fields are present depends on the captcha type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

mod edit_envelope {
    use super::EditApiInfo;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Envelope {
        #[serde(default)]
        edit: Option<EditApiInfo>,
    }

    pub fn serialize<S: Serializer>(
        value: &Option<EditApiInfo>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        Envelope {
            edit: value.clone(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<EditApiInfo>, D::Error> {
        Ok(Option::<Envelope>::deserialize(deserializer)?.and_then(|e| e.edit))
    }
}
