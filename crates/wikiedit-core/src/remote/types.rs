use crate::document::{EditMode, Section};
use crate::save::SaveOptions;
use crate::session::RevisionTokens;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server-side handle for previously uploaded HTML.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How document content travels in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    CacheKey(CacheKey),
    Html(Arc<str>),
    Wikitext(Arc<str>),
}

impl ContentPayload {
    pub fn is_cache_key(&self) -> bool {
        matches!(self, Self::CacheKey(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub mode: EditMode,
    pub page: String,
    pub section: Section,
    pub revision_id: Option<u64>,
    /// Wikitext to convert into visual content instead of loading the stored page.
    pub convert_wikitext: Option<String>,
}

/// Structured save-dialog checkbox definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxDef {
    pub name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default, rename = "label-message")]
    pub label_message: Option<String>,
    #[serde(default)]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnownLinks {
    /// Every title not listed as missing exists.
    All,
    Titles(Vec<String>),
}

impl Default for KnownLinks {
    fn default() -> Self {
        Self::Titles(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub missing: Vec<String>,
    pub known: KnownLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResponse {
    pub content: String,
    pub etag: Option<String>,
    pub revision_id: Option<u64>,
    pub base_timestamp: Option<String>,
    pub start_timestamp: Option<String>,
    pub notices: Vec<String>,
    pub links: LinkInfo,
    pub checkboxes: Vec<CheckboxDef>,
    pub protected_classes: Option<String>,
    /// The content is a previously stashed edit rather than the stored page.
    pub from_edited_state: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub page: String,
    pub payload: ContentPayload,
    pub tokens: RevisionTokens,
    pub edit_token: Option<String>,
    pub section: Section,
    pub section_title: Option<String>,
    pub options: SaveOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveResponse {
    pub content: String,
    pub categories_html: Option<String>,
    pub new_revision_id: Option<u64>,
    pub is_redirect: bool,
    pub display_title_html: Option<String>,
    pub last_modified: Option<String>,
    pub content_sub: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub page: String,
    pub payload: ContentPayload,
    pub tokens: RevisionTokens,
    pub edit_token: Option<String>,
    pub section: Section,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResponse {
    Diff(String),
    NoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeRequest {
    pub page: String,
    pub payload: ContentPayload,
    pub tokens: RevisionTokens,
    pub edit_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeResponse {
    pub wikitext: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub page: String,
    pub html: Arc<str>,
    pub tokens: RevisionTokens,
    pub edit_token: Option<String>,
}

/// Who the API session belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserIdentity {
    #[default]
    Anonymous,
    Registered { id: u64, name: String },
}

impl UserIdentity {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Registered { name, .. } => Some(name),
        }
    }

    /// Same account, compared by id so renames and normalisation don't matter.
    pub fn same_account(&self, other: &UserIdentity) -> bool {
        match (self, other) {
            (Self::Anonymous, Self::Anonymous) => true,
            (Self::Registered { id: a, .. }, Self::Registered { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub edit_token: String,
    pub user: UserIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_compares_by_id() {
        let before = UserIdentity::Registered {
            id: 7,
            name: "Example".to_string(),
        };
        let renamed = UserIdentity::Registered {
            id: 7,
            name: "Example2".to_string(),
        };
        assert!(before.same_account(&renamed));
        assert!(!before.same_account(&UserIdentity::Anonymous));
        assert!(UserIdentity::Anonymous.same_account(&UserIdentity::Anonymous));
    }
}
