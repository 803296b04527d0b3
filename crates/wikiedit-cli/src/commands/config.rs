use anyhow::{Context, Result};
use std::path::PathBuf;
use wikiedit_infrastructure::ConfigService;

pub fn service(path: Option<PathBuf>) -> ConfigService {
    match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    }
}

/// Prints the effective configuration, environment overrides included.
pub fn show(service: &ConfigService) -> Result<()> {
    let config = service.get_config();
    let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
    print!("{rendered}");
    Ok(())
}

pub fn path(service: &ConfigService) -> Result<()> {
    println!("{}", service.config_path()?.display());
    Ok(())
}
