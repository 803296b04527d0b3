use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wikiedit_core::document::{EditMode, Section};
use wikiedit_execution::{LogFormat, TracingOptions};

mod commands;

#[derive(Parser)]
#[command(name = "wikiedit")]
#[command(about = "wikiedit - edit wiki articles through an editing session", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print analytics events after the command finishes
    #[arg(long, global = true)]
    track: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace page content and publish it
    Edit {
        #[command(flatten)]
        page: PageArgs,

        /// Edit summary
        #[arg(long, default_value = "")]
        summary: String,

        /// Mark as a minor edit
        #[arg(long)]
        minor: bool,

        /// Add the page to the watchlist
        #[arg(long)]
        watch: bool,
    },
    /// Show the diff between the stored page and new content
    Diff {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Clone)]
pub struct PageArgs {
    /// Page title
    #[arg(long)]
    pub page: String,

    /// File holding the new content (wikitext in source mode, HTML in visual mode)
    #[arg(long)]
    pub content_file: PathBuf,

    /// Editing mode
    #[arg(long, default_value = "source")]
    pub mode: EditMode,

    /// Section number, or `new` for a new section
    #[arg(long)]
    pub section: Option<Section>,

    /// Heading of a new section
    #[arg(long)]
    pub section_title: Option<String>,

    /// The page does not exist yet
    #[arg(long)]
    pub create: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let tracking = wikiedit_execution::init_tracing(TracingOptions {
        format: if cli.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Human
        },
        filter: None,
        capture_tracking: cli.track,
        stderr: true,
    })?;

    let config = commands::config::service(cli.config.clone());

    match cli.command {
        Commands::Edit {
            page,
            summary,
            minor,
            watch,
        } => commands::edit::publish(&config, &page, summary, minor, watch).await?,
        Commands::Diff { page } => commands::edit::diff(&config, &page).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config)?,
            ConfigAction::Path => commands::config::path(&config)?,
        },
    }

    if let Some(mut receiver) = tracking {
        while let Ok(event) = receiver.try_recv() {
            eprintln!("{}", serde_json::to_string(&event)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_edit_arguments() {
        let cli = Cli::try_parse_from([
            "wikiedit",
            "edit",
            "--page",
            "Sandbox",
            "--content-file",
            "page.wiki",
            "--section",
            "2",
            "--summary",
            "copyedit",
            "--minor",
        ])
        .expect("Should parse edit");
        match cli.command {
            Commands::Edit {
                page,
                summary,
                minor,
                watch,
            } => {
                assert_eq!(page.page, "Sandbox");
                assert_eq!(page.mode, EditMode::Source);
                assert_eq!(page.section, Some(Section::Index(2)));
                assert_eq!(summary, "copyedit");
                assert!(minor);
                assert!(!watch);
            }
            _ => panic!("Expected edit command"),
        }
    }

    #[test]
    fn test_parses_visual_new_section() {
        let cli = Cli::try_parse_from([
            "wikiedit",
            "diff",
            "--page",
            "Sandbox",
            "--content-file",
            "page.html",
            "--mode",
            "visual",
            "--section",
            "new",
        ])
        .expect("Should parse diff");
        let Commands::Diff { page } = cli.command else {
            panic!("Expected diff command");
        };
        assert_eq!(page.mode, EditMode::Visual);
        assert_eq!(page.section, Some(Section::New));
    }

    #[test]
    fn test_config_path_uses_explicit_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("config.toml");
        let service = commands::config::service(Some(file.clone()));
        assert_eq!(service.config_path().expect("Should resolve path"), file);
        commands::config::show(&service).expect("Should render defaults");
    }
}
