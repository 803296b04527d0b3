use crate::config::UserPreferences;
use crate::remote::UserIdentity;
use crate::session::PageMetadata;

/// Capabilities of the page hosting the editor.
///
/// Replaces ambient globals: page metadata, the logged-in user, preferences
/// and page-level event handlers are all reached through this trait.
pub trait HostEnvironment: Send + Sync {
    fn page_metadata(&self) -> PageMetadata;

    fn user(&self) -> UserIdentity;

    /// Records a change of identity noticed during a token refresh.
    fn set_user(&self, user: UserIdentity);

    fn preferences(&self) -> UserPreferences;

    fn set_edit_on_double_click(&self, enabled: bool);

    /// Attaches page-level handlers (watch toggles, key bindings) for the session.
    fn bind_handlers(&self);

    fn unbind_handlers(&self);

    /// Notices the host adds to those returned by the load request.
    fn local_notices(&self) -> Vec<String> {
        Vec::new()
    }

    /// The classic wikitext editor is present on this page.
    fn has_classic_editor(&self) -> bool {
        false
    }

    /// Summary preset through the URL, if any.
    fn preset_summary(&self) -> Option<String> {
        None
    }
}
