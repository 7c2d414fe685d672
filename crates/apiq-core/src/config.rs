use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration loaded from `~/.config/apiq/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiqConfig {
    /// Prefix for every relative request path. Absolute http(s) URLs bypass it.
    pub base_url: String,
    /// Maximum number of requests in flight at once.
    pub simultaneous_calls: usize,
    /// Attempts per call (including the first) when the call does not say otherwise.
    pub max_attempts_per_call: u32,
    /// Per-call deadline in milliseconds; 0 means no deadline.
    pub timeout_ms: u64,
    /// `Content-Type` sent with POST, PUT and PATCH.
    pub content_type: String,
    /// Bearer token sent as `Authorization`, if any.
    pub authorization: Option<String>,
    /// Extra default headers sent with every call.
    pub headers: Vec<(String, String)>,
}

impl Default for ApiqConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            simultaneous_calls: 1,
            max_attempts_per_call: 1,
            timeout_ms: 0,
            content_type: "application/json".to_string(),
            authorization: None,
            headers: Vec::new(),
        }
    }
}

impl ApiqConfig {
    /// Concurrency ceiling, never below one.
    pub fn concurrency(&self) -> usize {
        self.simultaneous_calls.max(1)
    }

    /// Attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts_per_call.max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("apiq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ApiqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ApiqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<ApiqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: ApiqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
