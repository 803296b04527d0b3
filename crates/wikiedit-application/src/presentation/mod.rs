//! Presentation gateways over a host [`PageView`].
//!
//! Desktop and mobile differ in how edit mode looks and in which recovery
//! choices they offer; both share the chrome stash and the save dialog model.

mod desktop;
mod mobile;
mod save_dialog;

pub use desktop::DesktopPresentation;
pub use mobile::MobilePresentation;
pub use save_dialog::SaveDialogModel;

use std::sync::{Mutex, MutexGuard, PoisonError};
use wikiedit_core::page_view::{PageChrome, PageView};
use wikiedit_core::presentation::{Notification, PageContent};
use wikiedit_core::remote::UserIdentity;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-mode chrome saved on entering edit mode.
#[derive(Default)]
struct ChromeStash {
    saved: Mutex<Option<PageChrome>>,
}

impl ChromeStash {
    /// Saves the current chrome unless a stash is already held.
    fn save(&self, view: &dyn PageView) -> PageChrome {
        let current = view.chrome();
        lock(&self.saved).get_or_insert_with(|| current.clone());
        current
    }

    fn restore(&self, view: &dyn PageView) {
        if let Some(chrome) = lock(&self.saved).take() {
            view.set_chrome(chrome);
        }
    }

    /// Writes saved content into the page and into the stash, so leaving
    /// edit mode keeps it.
    fn replace_content(&self, view: &dyn PageView, content: &PageContent) {
        let mut live = view.chrome();
        apply_content(&mut live, content);
        view.set_chrome(live);
        if let Some(saved) = lock(&self.saved).as_mut() {
            apply_content(saved, content);
        }
    }
}

fn apply_content(chrome: &mut PageChrome, content: &PageContent) {
    chrome.content_html = content.html.clone();
    if content.categories_html.is_some() {
        chrome.categories_html = content.categories_html.clone();
    }
    if content.display_title_html.is_some() {
        chrome.display_title_html = content.display_title_html.clone();
    }
    if content.last_modified.is_some() {
        chrome.last_modified = content.last_modified.clone();
    }
    chrome.content_sub = content.content_sub.clone();
    chrome.is_redirect = content.is_redirect;
}

fn notification_text(notification: &Notification) -> String {
    match notification {
        Notification::Saved { message } => message.clone(),
        Notification::IdentityChanged { user } => match user {
            UserIdentity::Anonymous => "You are now logged out.".to_string(),
            UserIdentity::Registered { name, .. } => format!("You are now logged in as {name}."),
        },
    }
}
