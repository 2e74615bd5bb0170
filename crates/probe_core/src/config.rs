//! Configuration for probe runs.

use crate::error::{ProbeError, Result};
use crate::poller::PollBudget;
use crate::redact;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "PROBE_BASE_URL";

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "probe.toml";

/// Full probe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target API.
    #[serde(default)]
    pub api: ApiConfig,

    /// Job polling budget.
    #[serde(default)]
    pub poll: PollConfig,

    /// Test account template.
    #[serde(default)]
    pub user: UserConfig,

    /// Fixture locations.
    #[serde(default)]
    pub assets: AssetsConfig,
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| ProbeError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ProbeError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProbeError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| ProbeError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Apply `PROBE_BASE_URL` if set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
    }

    fn apply_base_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ProbeError::ConfigError("api.base_url is empty".into()));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ProbeError::ConfigError(
                "api.request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.user.email_domain.trim().is_empty() || self.user.email_domain.contains('@') {
            return Err(ProbeError::ConfigError(format!(
                "user.email_domain {:?} is not a bare domain",
                self.user.email_domain
            )));
        }
        Ok(())
    }
}

/// Target API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme and host, without the versioned prefix.
    pub base_url: String,

    /// Versioned prefix for every non-health endpoint (default: `/api/v1`).
    pub prefix: String,

    /// Per-request timeout in seconds (default: 30).
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.granula.raitokyokai.tech".to_string(),
            prefix: "/api/v1".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Job polling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between status polls (default: 2).
    pub interval_secs: u64,

    /// Status polls per job before giving up (default: 30).
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        let budget = PollBudget::default();
        Self {
            interval_secs: budget.interval.as_secs(),
            max_attempts: budget.max_attempts,
        }
    }
}

impl PollConfig {
    pub fn budget(&self) -> PollBudget {
        PollBudget::new(Duration::from_secs(self.interval_secs), self.max_attempts)
    }
}

/// Test account configuration. Every run registers a fresh address.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Local-part prefix of the generated email (default: `fulltest`).
    pub email_prefix: String,

    /// Domain of the generated email (default: `granula.ru`).
    pub email_domain: String,

    pub password: String,

    /// Display name (default: `Full Test User`).
    pub name: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            email_prefix: "fulltest".to_string(),
            email_domain: "granula.ru".to_string(),
            password: "SecurePassword123!".to_string(),
            name: "Full Test User".to_string(),
        }
    }
}

// Hand-written so `?config` in logs never prints the password.
impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("email_prefix", &self.email_prefix)
            .field("email_domain", &self.email_domain)
            .field("password", &redact::PLACEHOLDER)
            .field("name", &self.name)
            .finish()
    }
}

/// Fixture locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory scanned for the first `.jpg`/`.png` floor plan (default: `images`).
    pub images_dir: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
        }
    }
}
