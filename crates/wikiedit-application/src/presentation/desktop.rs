use super::{ChromeStash, SaveDialogModel, lock, notification_text};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use wikiedit_core::config::{EditorConfig, SiteConfig};
use wikiedit_core::document::{EditMode, Section};
use wikiedit_core::history::PageParams;
use wikiedit_core::page_view::PageView;
use wikiedit_core::presentation::{
    ConfirmPrompt, EditContext, LoadFailure, LoadRecovery, Notification, PageContent,
    PresentationGateway, SaveDialogData, SaveDialogUpdate, SubmitForm,
};
use wikiedit_core::remote::CaptchaInfo;

const ACTIVATED_CLASS: &str = "ve-activated";
const ACTIVE_CLASS: &str = "ve-active";

/// Full-page desktop editing: the toolbar slides in above the content and
/// the page title and tab reflect the edit.
pub struct DesktopPresentation {
    view: Arc<dyn PageView>,
    site: SiteConfig,
    toolbar_animation: Duration,
    stash: ChromeStash,
    dialog: Mutex<SaveDialogModel>,
    toolbar: Mutex<Option<EditMode>>,
}

impl DesktopPresentation {
    pub fn new(view: Arc<dyn PageView>, config: &EditorConfig) -> Self {
        Self {
            view,
            site: config.site.clone(),
            toolbar_animation: Duration::from_millis(config.presentation.toolbar_animation_ms),
            stash: ChromeStash::default(),
            dialog: Mutex::new(SaveDialogModel::default()),
            toolbar: Mutex::new(None),
        }
    }

    pub fn dialog(&self) -> SaveDialogModel {
        lock(&self.dialog).clone()
    }

    /// Mode of the visible toolbar, if any.
    pub fn toolbar(&self) -> Option<EditMode> {
        *lock(&self.toolbar)
    }

    fn edit_title(&self, context: &EditContext) -> String {
        let verb = if context.page_exists {
            "Editing"
        } else {
            "Creating"
        };
        let section = match context.section {
            Section::Index(_) => " (section)",
            Section::New => " (new section)",
            Section::Whole => "",
        };
        format!(
            "{verb} {}{section} - {}",
            context.page_name, self.site.site_name
        )
    }
}

#[async_trait]
impl PresentationGateway for DesktopPresentation {
    async fn enter_edit_mode(&self, context: &EditContext) {
        let mut chrome = self.stash.save(self.view.as_ref());
        chrome.document_title = self.edit_title(context);
        chrome.selected_tab = match context.mode {
            EditMode::Visual => "ve-edit".to_string(),
            EditMode::Source => "edit".to_string(),
        };
        chrome.classes.insert(ACTIVATED_CLASS.to_string());
        self.view.set_chrome(chrome);
    }

    async fn exit_edit_mode(&self) {
        self.stash.restore(self.view.as_ref());
    }

    async fn show_toolbar(&self, mode: EditMode) {
        if !self.toolbar_animation.is_zero() {
            tokio::time::sleep(self.toolbar_animation).await;
        }
        *lock(&self.toolbar) = Some(mode);
        debug!(%mode, "Toolbar shown");
    }

    async fn hide_toolbar(&self) {
        lock(&self.toolbar).take();
    }

    fn surface_ready(&self, context: &EditContext) {
        let mut chrome = self.view.chrome();
        chrome.classes.insert(ACTIVE_CLASS.to_string());
        chrome.document_title = self.edit_title(context);
        self.view.set_chrome(chrome);
    }

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
        match (retry, failure.fallback) {
            (true, _) => LoadRecovery::Retry,
            (false, Some(mode)) => LoadRecovery::FallBack(mode),
            (false, None) => LoadRecovery::Abandon,
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
}
