use std::path::PathBuf;

use anyhow::Context as _;
use serde::Deserialize;
use url::Url;

/// Runtime settings, file-overridable. Defaults target the official
/// bibliography site and stay polite to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Site origin; work links are resolved against it.
    pub base_url: String,
    /// Path of the works listing page under `base_url`.
    pub works_path: String,
    /// Minimum spacing between request starts.
    pub delay_ms: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries on transient failures (429/5xx/transport), on top of the
    /// initial attempt.
    pub retries: u32,
    /// Concurrent detail-page fetches.
    pub concurrency: usize,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://www.stephenking.com".to_owned(),
            works_path: "/works/".to_owned(),
            delay_ms: 500,
            timeout_secs: 30,
            retries: 3,
            concurrency: 10,
            cache_dir: PathBuf::from(".cache"),
            cache_ttl_secs: 86_400,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_owned(),
        }
    }
}

impl Settings {
    pub fn works_url(&self) -> anyhow::Result<Url> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("parse base url: {}", self.base_url))?;
        base.join(&self.works_path)
            .with_context(|| format!("resolve works path: {}", self.works_path))
    }
}

/// Defaults, overlaid with a TOML file when one is given.
pub fn load(config_path: Option<&str>) -> anyhow::Result<Settings> {
    let Some(path) = config_path else {
        return Ok(Settings::default());
    };

    let contents =
        std::fs::read_to_string(path).with_context(|| format!("read config file: {path}"))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("parse config file: {path}"))?;
    Ok(settings)
}
