use crate::document::EditMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub editor: ModeConfig,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl EditorConfig {
    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml(source: &str) -> crate::Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    format!("wikiedit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Pretty URL template; `$1` is replaced with the encoded title.
    #[serde(default = "default_article_path")]
    pub article_path: String,
    #[serde(default = "default_script_path")]
    pub script_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            article_path: default_article_path(),
            script_path: default_script_path(),
        }
    }
}

fn default_site_name() -> String {
    "Wikipedia".to_string()
}

fn default_article_path() -> String {
    "/wiki/$1".to_string()
}

fn default_script_path() -> String {
    "/w/index.php".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModeConfig {
    #[serde(default)]
    pub default_mode: EditMode,
    #[serde(default = "default_available_modes")]
    pub available_modes: Vec<EditMode>,
}

impl ModeConfig {
    pub fn is_available(&self, mode: EditMode) -> bool {
        self.available_modes.contains(&mode)
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            default_mode: EditMode::default(),
            available_modes: default_available_modes(),
        }
    }
}

fn default_available_modes() -> Vec<EditMode> {
    vec![EditMode::Visual, EditMode::Source]
}

/// Per-user switches consulted by the session controller.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UserPreferences {
    /// Require a non-empty, changed edit summary before saving.
    #[serde(default)]
    pub force_edit_summary: bool,
    /// Warn before leaving the page or discarding edits.
    #[serde(default = "default_true")]
    pub use_edit_warning: bool,
    #[serde(default)]
    pub edit_on_double_click: bool,
    #[serde(default)]
    pub watch_default: bool,
    #[serde(default)]
    pub watch_creations: bool,
    /// Label the save button "Publish" instead of "Save".
    #[serde(default = "default_true")]
    pub publish_button_label: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            force_edit_summary: false,
            use_edit_warning: true,
            edit_on_double_click: false,
            watch_default: false,
            watch_creations: false,
            publish_button_label: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PresentationConfig {
    #[serde(default = "default_toolbar_animation_ms")]
    pub toolbar_animation_ms: u64,
    /// Use `action=edit` URLs instead of `veaction=...`.
    #[serde(default)]
    pub single_edit_tab: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            toolbar_animation_ms: default_toolbar_animation_ms(),
            single_edit_tab: false,
        }
    }
}

fn default_toolbar_animation_ms() -> u64 {
    400
}
