//! Host page surface the desktop and mobile presentations render into.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of the page chrome the editor touches.
///
/// Taken when entering edit mode and written back on exit, so a full
/// activate/deactivate cycle leaves the page as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageChrome {
    pub document_title: String,
    pub content_html: String,
    pub categories_html: Option<String>,
    pub display_title_html: Option<String>,
    pub last_modified: Option<String>,
    pub content_sub: Option<String>,
    pub is_redirect: bool,
    pub classes: BTreeSet<String>,
    pub selected_tab: String,
    pub url: String,
}

#[async_trait]
pub trait PageView: Send + Sync {
    fn chrome(&self) -> PageChrome;

    fn set_chrome(&self, chrome: PageChrome);

    fn scroll_top(&self) -> u32;

    fn set_scroll_top(&self, top: u32);

    fn set_unload_warning(&self, message: Option<String>);

    /// Modal yes/no question.
    async fn confirm(&self, message: &str) -> bool;

    fn alert(&self, message: &str);

    /// Non-modal message, e.g. the post-edit confirmation.
    fn toast(&self, message: &str);

    fn navigate(&self, url: &str);

    fn submit(&self, action_url: &str, fields: &BTreeMap<String, String>);
}
