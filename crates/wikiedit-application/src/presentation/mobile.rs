use super::{ChromeStash, SaveDialogModel, lock, notification_text};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use wikiedit_core::config::{EditorConfig, SiteConfig};
use wikiedit_core::document::EditMode;
use wikiedit_core::history::PageParams;
use wikiedit_core::page_view::PageView;
use wikiedit_core::presentation::{
    ConfirmPrompt, EditContext, LoadFailure, LoadRecovery, Notification, PageContent,
    PresentationGateway, SaveDialogData, SaveDialogUpdate, SubmitForm,
};
use wikiedit_core::remote::CaptchaInfo;

const OVERLAY_CLASS: &str = "overlay-enabled";

/// Mobile editing in a full-screen overlay.
///
/// No toolbar animation and no mode fallback after a failed load.
pub struct MobilePresentation {
    view: Arc<dyn PageView>,
    site: SiteConfig,
    stash: ChromeStash,
    dialog: Mutex<SaveDialogModel>,
    toolbar: Mutex<Option<EditMode>>,
}

impl MobilePresentation {
    pub fn new(view: Arc<dyn PageView>, config: &EditorConfig) -> Self {
        Self {
            view,
            site: config.site.clone(),
            stash: ChromeStash::default(),
            dialog: Mutex::new(SaveDialogModel::default()),
            toolbar: Mutex::new(None),
        }
    }

    pub fn dialog(&self) -> SaveDialogModel {
        lock(&self.dialog).clone()
    }

    pub fn toolbar(&self) -> Option<EditMode> {
        *lock(&self.toolbar)
    }
}

#[async_trait]
impl PresentationGateway for MobilePresentation {
    async fn enter_edit_mode(&self, _context: &EditContext) {
        let mut chrome = self.stash.save(self.view.as_ref());
        chrome.classes.insert(OVERLAY_CLASS.to_string());
        self.view.set_chrome(chrome);
    }

    async fn exit_edit_mode(&self) {
        self.stash.restore(self.view.as_ref());
    }

    async fn show_toolbar(&self, mode: EditMode) {
        *lock(&self.toolbar) = Some(mode);
    }

    async fn hide_toolbar(&self) {
        lock(&self.toolbar).take();
    }

    fn surface_ready(&self, _context: &EditContext) {}

    fn set_save_enabled(&self, enabled: bool) {
        lock(&self.dialog).save_enabled = enabled;
    }

    fn scroll_position(&self) -> u32 {
        self.view.scroll_top()
    }

    fn restore_scroll_position(&self, top: u32) {
        self.view.set_scroll_top(top);
    }

    fn open_save_dialog(&self, data: SaveDialogData) {
        lock(&self.dialog).open(data);
    }

    fn update_save_dialog(&self, update: SaveDialogUpdate) {
        lock(&self.dialog).apply(update);
    }

    fn close_dialogs(&self) {
        lock(&self.dialog).close();
    }

    fn show_conflict(&self) {
        lock(&self.dialog).show_conflict();
    }

    fn show_captcha(&self, challenge: &CaptchaInfo) {
        lock(&self.dialog).show_captcha(challenge.clone());
    }

    async fn confirm(&self, prompt: ConfirmPrompt) -> bool {
        self.view.confirm(prompt.message()).await
    }

    async fn choose_load_recovery(&self, failure: &LoadFailure) -> LoadRecovery {
        let retry = self
            .view
            .confirm(&format!(
                "Error loading data from server: {}. Would you like to retry?",
                failure.message
            ))
            .await;
        if retry {
            LoadRecovery::Retry
        } else {
            LoadRecovery::Abandon
        }
    }

    fn replace_page_content(&self, content: &PageContent) {
        self.stash.replace_content(self.view.as_ref(), content);
    }

    fn navigate(&self, target: PageParams) {
        self.view.navigate(&target.to_url(&self.site));
    }

    fn submit_form(&self, form: SubmitForm) {
        self.view
            .submit(&form.target.to_url(&self.site), &form.fields);
    }

    fn notify(&self, notification: Notification) {
        self.view.toast(&notification_text(&notification));
    }

    fn alert(&self, message: &str) {
        self.view.alert(message);
    }

    fn set_unload_warning(&self, message: Option<String>) {
        self.view.set_unload_warning(message);
    }

    fn offers_mode_fallback(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::test_support::FakeView;
    use wikiedit_core::document::Section;

    #[tokio::test]
    async fn test_overlay_round_trip() {
        let view = Arc::new(FakeView::default());
        let mobile = MobilePresentation::new(view.clone(), &EditorConfig::default());
        let before = view.chrome();

        mobile
            .enter_edit_mode(&EditContext {
                page_name: "Test".to_string(),
                page_exists: true,
                mode: EditMode::Visual,
                section: Section::Whole,
            })
            .await;
        assert!(view.chrome().classes.contains(OVERLAY_CLASS));

        mobile.exit_edit_mode().await;
        assert_eq!(view.chrome(), before);
    }

    #[tokio::test]
    async fn test_never_offers_fallback() {
        let view = Arc::new(FakeView::default());
        let mobile = MobilePresentation::new(view.clone(), &EditorConfig::default());
        assert!(!mobile.offers_mode_fallback());

        view.answer(false);
        let recovery = mobile
            .choose_load_recovery(&LoadFailure {
                message: "timeout".to_string(),
                fallback: Some(EditMode::Source),
            })
            .await;
        assert_eq!(recovery, LoadRecovery::Abandon);
    }
}
