use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const LOG_FOLDER_NAME: &str = "storefront-logs";

/// Resolve the folder the executable runs from, falling back to the working directory.
pub fn resolve_deployment_folder() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve (and create) the log folder.
///
/// Order: explicit override from config, then the platform data dir
/// (`<data_dir>/storefront/logs`), then `storefront-logs/` next to the executable.
pub fn resolve_log_folder(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(p) => p.to_path_buf(),
        None => match dirs::data_local_dir() {
            Some(base) => base.join("storefront").join("logs"),
            None => resolve_deployment_folder().join(LOG_FOLDER_NAME),
        },
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log folder: {:?}", dir))?;
    Ok(dir)
}

/// Default location of the optional config file: `<config_dir>/storefront/storefront.toml`,
/// or `./storefront.toml` when the platform has no config dir.
pub fn default_config_file() -> PathBuf {
    match dirs::config_dir() {
        Some(base) => base.join("storefront").join("storefront.toml"),
        None => PathBuf::from("storefront.toml"),
    }
}
