//! A headless editing session: the desktop presentation drawn onto an
//! in-memory page view, talking to the configured API.

use crate::PageArgs;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wikiedit_application::{DesktopPresentation, EditSessionController};
use wikiedit_core::config::EditorConfig;
use wikiedit_core::history::PageParams;
use wikiedit_core::page_view::PageChrome;
use wikiedit_core::remote::RemoteEditClient;
use wikiedit_core::session::PageMetadata;
use wikiedit_infrastructure::{ConfigService, MemoryHistory, MemoryPageView, StaticHost};
use wikiedit_interaction::MediaWikiEditClient;

pub struct HeadlessSession {
    pub controller: EditSessionController,
    pub presentation: Arc<DesktopPresentation>,
    pub view: Arc<MemoryPageView>,
    pub config: EditorConfig,
}

fn read_chrome(title: &str, config: &EditorConfig) -> PageChrome {
    PageChrome {
        document_title: format!("{} - {}", title, config.site.site_name),
        selected_tab: "view".to_string(),
        url: PageParams::new(title).to_url(&config.site),
        ..Default::default()
    }
}

impl HeadlessSession {
    /// Fetches an edit token, then opens the editor on the page.
    pub async fn open(service: &ConfigService, args: &PageArgs) -> Result<Self> {
        let mut config = service.get_config();
        // Nobody watches the toolbar slide in.
        config.presentation.toolbar_animation_ms = 0;

        let client = Arc::new(
            MediaWikiEditClient::new(&config.api).context("Failed to create API client")?,
        );
        let token = client
            .fetch_token_info(CancellationToken::new())
            .await
            .context("Failed to fetch an edit token")?;
        info!(user = ?token.user.name(), endpoint = %client.endpoint(), "Session token acquired");

        let metadata = PageMetadata {
            title: args.page.clone(),
            exists: !args.create,
            edit_token: Some(token.edit_token),
            ..Default::default()
        };
        let host = Arc::new(
            StaticHost::new(metadata)
                .with_preferences(config.preferences.clone())
                .with_user(token.user),
        );
        let view = Arc::new(MemoryPageView::new(read_chrome(&args.page, &config)));
        let presentation = Arc::new(DesktopPresentation::new(view.clone(), &config));
        let history = Arc::new(MemoryHistory::new(PageParams::new(&args.page)));

        let controller = EditSessionController::new(
            config.clone(),
            client,
            presentation.clone(),
            host,
            history,
        );
        controller
            .activate(args.mode, args.section.unwrap_or_default())
            .await
            .with_context(|| format!("Failed to open the editor on {}", args.page))?;

        Ok(Self {
            controller,
            presentation,
            view,
            config,
        })
    }

    /// Replaces the document with the content file.
    pub async fn apply(&self, args: &PageArgs) -> Result<()> {
        let content = tokio::fs::read_to_string(&args.content_file)
            .await
            .with_context(|| format!("Failed to read {}", args.content_file.display()))?;
        self.controller.update_document(content).await?;
        if let Some(title) = &args.section_title {
            self.controller.set_section_title(title.clone()).await?;
        }
        Ok(())
    }

    /// Leaves the editor without asking about unsaved edits.
    pub async fn close(&self) -> Result<()> {
        self.controller.deactivate(true, Some("cli")).await?;
        Ok(())
    }

    /// Alerts and dialog messages the session produced, for error reports.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = self.view.alerts();
        messages.extend(
            self.presentation
                .dialog()
                .messages
                .into_iter()
                .map(|notice| format!("{}: {}", notice.kind, notice.message)),
        );
        messages
    }
}
