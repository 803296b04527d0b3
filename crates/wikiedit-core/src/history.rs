//! Browser-history capability and URL parameters.

use crate::config::SiteConfig;
use crate::document::{EditMode, Section};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Tag stored in every history entry the editor creates.
pub const EDITOR_HISTORY_TAG: &str = "wikiedit";

/// Opaque state attached to a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub tag: String,
}

impl HistoryState {
    pub fn editor() -> Self {
        Self {
            tag: EDITOR_HISTORY_TAG.to_string(),
        }
    }

    pub fn is_editor(&self) -> bool {
        self.tag == EDITOR_HISTORY_TAG
    }
}

/// Page title plus query parameters of a page URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub title: String,
    pub query: BTreeMap<String, String>,
}

impl PageParams {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            query: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.query.remove(key)
    }

    /// Editing mode named by `veaction`, if any.
    pub fn edit_mode(&self) -> Option<EditMode> {
        self.get("veaction").and_then(EditMode::from_veaction)
    }

    pub fn section(&self) -> Option<Section> {
        Section::from_param(self.get("section"))
    }

    /// Nothing beyond the title is set.
    pub fn is_plain_view(&self) -> bool {
        self.query.is_empty() || (self.query.len() == 1 && self.query.contains_key("title"))
    }

    /// Site-relative URL. Plain views use the pretty article path.
    pub fn to_url(&self, site: &SiteConfig) -> String {
        let title = self.title.replace(' ', "_");
        if self.is_plain_view() {
            let encoded: String = form_urlencoded::byte_serialize(title.as_bytes()).collect();
            return site.article_path.replace("$1", &encoded.replace("%2F", "/"));
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("title", &title);
        for (key, value) in self.query.iter().filter(|(k, _)| k.as_str() != "title") {
            serializer.append_pair(key, value);
        }
        format!("{}?{}", site.script_path, serializer.finish())
    }

    /// Parses a site-relative URL produced by [`PageParams::to_url`].
    pub fn from_url(url: &str, site: &SiteConfig) -> Option<Self> {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let mut params = BTreeMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
        let title = match params.remove("title") {
            Some(title) => title,
            None => {
                let prefix = site.article_path.strip_suffix("$1")?;
                let raw = path.strip_prefix(prefix)?;
                form_urlencoded::parse(format!("t={raw}").as_bytes())
                    .next()
                    .map(|(_, v)| v.into_owned())?
            }
        };
        Some(Self {
            title: title.replace('_', " "),
            query: params,
        })
    }
}

/// Navigation-history capability of the host.
pub trait HistoryBackend: Send + Sync {
    fn current(&self) -> PageParams;
    fn push_state(&self, state: HistoryState, params: PageParams);
    fn replace_state(&self, state: HistoryState, params: PageParams);
}
