use anyhow::{Result, anyhow};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::mail::loader::TempFlag;
use crate::mail::sanitize::DEFAULT_LINK_BASE;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:1323";

pub const ENV_API: &str = "MAIL_DASHBOARD_API";
pub const ENV_LINK_BASE: &str = "MAIL_DASHBOARD_LINK_BASE";
pub const ENV_LLM_LOCALHOST: &str = "MAIL_DASHBOARD_LLM_LOCALHOST";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Origin that serves the `/api/...` endpoints.
    pub api_base: String,
    /// Prefix for relative links found in mail bodies.
    pub link_base: String,
    /// Passed as `localhost=` on every inference call.
    pub llm_localhost: bool,
    pub temp: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            link_base: DEFAULT_LINK_BASE.to_string(),
            llm_localhost: true,
            temp: TempFlag::No.as_str().to_string(),
        }
    }
}

impl Config {
    pub fn temp_flag(&self) -> TempFlag {
        TempFlag::parse(&self.temp)
    }

    /// Apply environment-style overrides. `get` is `std::env::var(..).ok()` in
    /// the binary and a map lookup in tests.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get(ENV_API).filter(|v| !v.trim().is_empty()) {
            self.api_base = v;
        }
        if let Some(v) = get(ENV_LINK_BASE).filter(|v| !v.trim().is_empty()) {
            self.link_base = v;
        }
        if let Some(v) = get(ENV_LLM_LOCALHOST) {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.llm_localhost = true,
                "0" | "false" | "no" => self.llm_localhost = false,
                other => warn!("ignoring {ENV_LLM_LOCALHOST}={other}"),
            }
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("mail_dashboard"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

/// Load the user config, then the environment on top of it.
pub fn load_config() -> Result<Config> {
    let mut cfg = load_config_from(&config_path()?)?;
    cfg.apply_overrides(|k| std::env::var(k).ok());
    Ok(cfg)
}

/// Reads `path`, writing a template with the defaults first if it is missing.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config::default();
        fs::write(path, toml::to_string_pretty(&sample)?)?;
        info!("created template config at {}", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config =
        toml::from_str(&s).map_err(|e| anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}
