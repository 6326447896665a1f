//! CLI command implementations

pub mod banks;
pub mod link;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bankdata_core::services::AuthorizationService;
use bankdata_core::SyncContext;

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKDATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankdata"))
        .context("Could not find home directory; set BANKDATA_DIR")
}

fn ensure_data_dir() -> Result<PathBuf> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    Ok(data_dir)
}

/// Build the sync context; `dry_run` keeps exports in memory
pub fn get_context(dry_run: bool) -> Result<SyncContext> {
    let data_dir = ensure_data_dir()?;

    let ctx = if dry_run {
        SyncContext::dry_run(&data_dir)
    } else {
        SyncContext::new(&data_dir)
    };
    ctx.context("Failed to initialize sync context")
}

/// Authorization service for `status` and `link`; no storage backend is built
pub fn get_authorization_service() -> Result<AuthorizationService> {
    let data_dir = ensure_data_dir()?;
    bankdata_core::authorization_service(&data_dir)
        .context("Failed to initialize authorization service")
}
