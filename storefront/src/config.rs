// Application configuration
//
// Layering (later wins): built-in defaults -> optional TOML file -> STOREFRONT_* env vars.

use crate::wizard::SubmissionOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "STOREFRONT";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 3000;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Per-request timeout for REST calls and submissions. Absent means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    pub redirect_delay_ms: u64,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: None,
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            page_size: DEFAULT_PAGE_SIZE,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load from defaults, the given file (if it exists) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("redirect_delay_ms", DEFAULT_REDIRECT_DELAY_MS as i64)?
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let cfg: AppConfig = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_base_url)
            .with_context(|| format!("api_base_url is not a valid URL: {}", self.api_base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("api_base_url must use http or https");
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be a positive number");
        }
        if self.request_timeout_ms == Some(0) {
            anyhow::bail!("request_timeout_ms must be positive when set");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn submission_options(&self) -> SubmissionOptions {
        SubmissionOptions {
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
            request_timeout: self.request_timeout(),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}
