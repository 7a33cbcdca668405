//! Configuration loading for the Shopwarden patrol pipeline.
//!
//! A [`PatrolConfig`] is built once at startup and passed explicitly into
//! the controller; nothing in the pipeline reads ambient global state.
//! Overrides load from the environment in this order:
//! 1) `$PATROL_CONFIG_PATH` (TOML or JSON file),
//! 2) `$PATROL_CONFIG_JSON` (inline JSON),
//! 3) a default file (`patrol.toml`, `patrol.json`, `config/...`),
//! 4) built-in defaults.
//! Credentials may additionally be supplied via `$CLASSIFIER_API_KEY` and
//! `$CATALOG_APP_ID`, which take precedence over file values.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Source that produced the patrol configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PatrolConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Risk-classifier endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Classification endpoint URL.
    pub endpoint: String,
    /// Endpoint credential. Usually injected via `$CLASSIFIER_API_KEY`.
    pub api_key: String,
    /// Per-call request timeout in seconds. A call that exceeds this is
    /// recorded as an error verdict, not retried.
    pub timeout_secs: u64,
    /// Retry budget for rate-limited (429) and 5xx responses.
    pub max_retries: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 8,
        }
    }
}

/// Remote storefront search endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Storefront item-search endpoint URL.
    pub endpoint: String,
    /// Application credential for the storefront API. Usually injected
    /// via `$CATALOG_APP_ID`.
    pub app_id: String,
    /// Items per page. The storefront serves fixed pages of 30.
    pub page_size: u32,
    /// Hard cap on items fetched from one shop, if any.
    pub max_items: Option<u32>,
    /// Page-fetch timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            app_id: String::new(),
            page_size: 30,
            max_items: None,
            timeout_secs: 30,
        }
    }
}

/// Throughput pacing. High-speed mode widens batches and drops the
/// inter-batch delay, trading rate-limit headroom for speed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PacingConfig {
    pub high_speed: bool,
    /// Delay between remote page fetches, in milliseconds. Ignored in
    /// high-speed mode.
    pub inter_page_delay_ms: u64,
    /// Target item count a resumed session runs to, so resumption always
    /// proceeds to the end of the catalog.
    pub full_scan_target: usize,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            high_speed: false,
            inter_page_delay_ms: 1_000,
            full_scan_target: 3_000,
        }
    }
}

/// Top-level patrol settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PatrolConfig {
    pub classifier: ClassifierConfig,
    pub catalog: CatalogConfig,
    pub pacing: PacingConfig,
}

impl PatrolConfig {
    /// Load configuration overrides using environment variables. See the
    /// crate docs for the evaluation order.
    pub fn load_from_env() -> anyhow::Result<(Self, PatrolConfigSource)> {
        // A .env next to the binary is a convenience, not a requirement.
        let _ = dotenvy::dotenv();

        let (mut config, source) = Self::load_without_credentials()?;
        config.apply_credential_env();
        Ok((config, source))
    }

    fn load_without_credentials() -> anyhow::Result<(Self, PatrolConfigSource)> {
        if let Ok(path_str) = env::var("PATROL_CONFIG_PATH")
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, PatrolConfigSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var("PATROL_CONFIG_JSON")
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .context("failed to parse PATROL_CONFIG_JSON")?;
            return Ok((parsed, PatrolConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, PatrolConfigSource::File(path)));
        }

        Ok((Self::default(), PatrolConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read patrol config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid patrol config {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!("invalid patrol config {}: {}", path.display(), err)
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse patrol config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid patrol config json: {err}"))
    }

    fn apply_credential_env(&mut self) {
        if let Ok(key) = env::var("CLASSIFIER_API_KEY")
            && !key.trim().is_empty()
        {
            self.classifier.api_key = key;
        }
        if let Ok(id) = env::var("CATALOG_APP_ID")
            && !id.trim().is_empty()
        {
            self.catalog.app_id = id;
        }
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "patrol.toml",
            "patrol.json",
            "config/patrol.toml",
            "config/patrol.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }
}
