use super::session::HeadlessSession;
use crate::PageArgs;
use anyhow::{Context, Result};
use wikiedit_application::SaveOutcome;
use wikiedit_core::presentation::SaveDialogPanel;
use wikiedit_core::save::{FIELD_MINOR, FIELD_WATCH, SaveDialogFields};
use wikiedit_core::session::ReviewContent;
use wikiedit_infrastructure::ConfigService;

pub async fn publish(
    service: &ConfigService,
    args: &PageArgs,
    summary: String,
    minor: bool,
    watch: bool,
) -> Result<()> {
    let session = HeadlessSession::open(service, args).await?;
    session.apply(args).await?;

    if !session
        .controller
        .open_save_dialog(SaveDialogPanel::Save)
        .await?
    {
        println!("No changes to publish.");
        return session.close().await;
    }

    let mut fields = SaveDialogFields::with_summary(summary);
    if minor {
        fields = fields.check(FIELD_MINOR);
    }
    if watch {
        fields = fields.check(FIELD_WATCH);
    }

    match session.controller.save_from_dialog(fields).await {
        Ok(SaveOutcome::Saved { new_revision_id }) => {
            match new_revision_id {
                Some(id) => println!("Published revision {id}."),
                None => println!("Published."),
            }
            Ok(())
        }
        Ok(SaveOutcome::Navigated(params)) => {
            println!("Published: {}", params.to_url(&session.config.site));
            Ok(())
        }
        Err(e) => {
            for message in session.messages() {
                eprintln!("{message}");
            }
            session.close().await?;
            Err(e).context("Save failed")
        }
    }
}

pub async fn diff(service: &ConfigService, args: &PageArgs) -> Result<()> {
    let session = HeadlessSession::open(service, args).await?;
    session.apply(args).await?;

    let review = session.controller.review().await;
    session.close().await?;
    match review.context("Failed to compute changes")? {
        ReviewContent::Diff(html) => println!("{html}"),
        ReviewContent::Wikitext(text) => println!("{text}"),
        ReviewContent::NoChanges => println!("No changes."),
    }
    Ok(())
}
