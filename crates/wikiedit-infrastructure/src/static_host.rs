use std::sync::{Mutex, MutexGuard, PoisonError};
use wikiedit_core::config::UserPreferences;
use wikiedit_core::host::HostEnvironment;
use wikiedit_core::remote::UserIdentity;
use wikiedit_core::session::PageMetadata;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host environment with fixed page facts, set up through builders.
///
/// Identity changes and handler bindings are recorded so callers can check
/// them after a session.
#[derive(Debug)]
pub struct StaticHost {
    metadata: PageMetadata,
    preferences: UserPreferences,
    user: Mutex<UserIdentity>,
    local_notices: Vec<String>,
    classic_editor: bool,
    preset_summary: Option<String>,
    handlers_bound: Mutex<bool>,
    edit_on_double_click: Mutex<bool>,
}

impl StaticHost {
    pub fn new(metadata: PageMetadata) -> Self {
        let preferences = UserPreferences::default();
        let edit_on_double_click = preferences.edit_on_double_click;
        Self {
            metadata,
            preferences,
            user: Mutex::new(UserIdentity::Anonymous),
            local_notices: Vec::new(),
            classic_editor: false,
            preset_summary: None,
            handlers_bound: Mutex::new(false),
            edit_on_double_click: Mutex::new(edit_on_double_click),
        }
    }

    pub fn with_preferences(mut self, preferences: UserPreferences) -> Self {
        self.edit_on_double_click = Mutex::new(preferences.edit_on_double_click);
        self.preferences = preferences;
        self
    }

    pub fn with_user(self, user: UserIdentity) -> Self {
        *lock(&self.user) = user;
        self
    }

    pub fn with_local_notices(mut self, notices: Vec<String>) -> Self {
        self.local_notices = notices;
        self
    }

    pub fn with_classic_editor(mut self) -> Self {
        self.classic_editor = true;
        self
    }

    pub fn with_preset_summary(mut self, summary: impl Into<String>) -> Self {
        self.preset_summary = Some(summary.into());
        self
    }

    pub fn handlers_bound(&self) -> bool {
        *lock(&self.handlers_bound)
    }

    pub fn edit_on_double_click(&self) -> bool {
        *lock(&self.edit_on_double_click)
    }
}

impl HostEnvironment for StaticHost {
    fn page_metadata(&self) -> PageMetadata {
        self.metadata.clone()
    }

    fn user(&self) -> UserIdentity {
        lock(&self.user).clone()
    }

    fn set_user(&self, user: UserIdentity) {
        *lock(&self.user) = user;
    }

    fn preferences(&self) -> UserPreferences {
        self.preferences.clone()
    }

    fn set_edit_on_double_click(&self, enabled: bool) {
        *lock(&self.edit_on_double_click) = enabled;
    }

    fn bind_handlers(&self) {
        *lock(&self.handlers_bound) = true;
    }

    fn unbind_handlers(&self) {
        *lock(&self.handlers_bound) = false;
    }

    fn local_notices(&self) -> Vec<String> {
        self.local_notices.clone()
    }

    fn has_classic_editor(&self) -> bool {
        self.classic_editor
    }

    fn preset_summary(&self) -> Option<String> {
        self.preset_summary.clone()
    }
}
