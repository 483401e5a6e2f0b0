//! Console configuration
//!
//! Stored as TOML under `~/.sentinel/`, one file per profile.

use crate::api::{ApiClient, Credentials, SoarApi};
use crate::error::{ConsoleError, ConsoleResult};
use crate::session::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
use crate::simulation::SimulatedApi;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Where console data comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Live,
    Simulation,
}

impl std::str::FromStr for DataMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(DataMode::Live),
            "simulation" | "sim" => Ok(DataMode::Simulation),
            other => Err(format!("unknown mode: {} (expected live or simulation)", other)),
        }
    }
}

impl std::fmt::Display for DataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataMode::Live => f.write_str("live"),
            DataMode::Simulation => f.write_str("simulation"),
        }
    }
}

/// Poll periods in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollIntervals {
    pub live_traffic_ms: u64,
    pub health_ms: u64,
    pub metrics_ms: u64,
    pub admin_ms: u64,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            live_traffic_ms: 2000,
            health_ms: 5000,
            metrics_ms: 5000,
            admin_ms: 5000,
        }
    }
}

impl PollIntervals {
    pub fn live_traffic(&self) -> Duration {
        Duration::from_millis(self.live_traffic_ms)
    }

    pub fn health(&self) -> Duration {
        Duration::from_millis(self.health_ms)
    }

    pub fn metrics(&self) -> Duration {
        Duration::from_millis(self.metrics_ms)
    }

    pub fn admin(&self) -> Duration {
        Duration::from_millis(self.admin_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub mode: DataMode,
    pub request_timeout_secs: u64,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub default_format: Option<String>,
    /// Fixed seed for reproducible simulation runs
    pub simulation_seed: Option<u64>,
    pub poll: PollIntervals,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            mode: DataMode::Live,
            request_timeout_secs: 10,
            log_level: "warn".to_string(),
            default_format: None,
            simulation_seed: None,
            poll: PollIntervals::default(),
        }
    }
}

/// Keys accepted by [`ConsoleConfig::set`] and [`ConsoleConfig::get`]
pub const CONFIG_KEYS: &[&str] = &[
    "api_url",
    "mode",
    "request_timeout_secs",
    "log_level",
    "default_format",
    "simulation_seed",
    "poll.live_traffic_ms",
    "poll.health_ms",
    "poll.metrics_ms",
    "poll.admin_ms",
];

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> ConsoleResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConsoleError::Config(format!("{} expects a number, got '{}'", key, value)))
}

impl ConsoleConfig {
    /// Load a profile, falling back to defaults when the file is missing
    pub fn load(profile: Option<&str>) -> ConsoleResult<Self> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn load_from(path: &Path) -> ConsoleResult<Self> {
        let config = Self::read_from(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`ConsoleConfig::load`] but without validation, so a broken
    /// value can still be inspected and corrected
    pub fn read(profile: Option<&str>) -> ConsoleResult<Self> {
        Self::read_from(&Self::config_path(profile)?)
    }

    pub fn read_from(path: &Path) -> ConsoleResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, profile: Option<&str>) -> ConsoleResult<PathBuf> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> ConsoleResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConsoleError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_dir() -> ConsoleResult<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".sentinel"))
            .ok_or_else(|| ConsoleError::Config("cannot find home directory".into()))
    }

    pub fn config_path(profile: Option<&str>) -> ConsoleResult<PathBuf> {
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(Self::config_dir()?.join(filename))
    }

    pub fn validate(&self) -> ConsoleResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConsoleError::Config(format!("api_url must be an http(s) URL, got '{}'", self.api_url)));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConsoleError::Config("request_timeout_secs must be positive".into()));
        }
        let p = &self.poll;
        if [p.live_traffic_ms, p.health_ms, p.metrics_ms, p.admin_ms].contains(&0) {
            return Err(ConsoleError::Config("poll intervals must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn set(&mut self, key: &str, value: &str) -> ConsoleResult<()> {
        match key {
            "api_url" => self.api_url = value.trim().to_string(),
            "mode" => self.mode = value.parse().map_err(ConsoleError::Config)?,
            "request_timeout_secs" => self.request_timeout_secs = parse_num(key, value)?,
            "log_level" => self.log_level = value.trim().to_string(),
            "default_format" => self.default_format = Some(value.trim().to_string()),
            "simulation_seed" => self.simulation_seed = Some(parse_num(key, value)?),
            "poll.live_traffic_ms" => self.poll.live_traffic_ms = parse_num(key, value)?,
            "poll.health_ms" => self.poll.health_ms = parse_num(key, value)?,
            "poll.metrics_ms" => self.poll.metrics_ms = parse_num(key, value)?,
            "poll.admin_ms" => self.poll.admin_ms = parse_num(key, value)?,
            _ => return Err(ConsoleError::Config(format!("unknown config key: {}", key))),
        }
        self.validate()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "api_url" => self.api_url.clone(),
            "mode" => self.mode.to_string(),
            "request_timeout_secs" => self.request_timeout_secs.to_string(),
            "log_level" => self.log_level.clone(),
            "default_format" => self.default_format.clone()?,
            "simulation_seed" => self.simulation_seed?.to_string(),
            "poll.live_traffic_ms" => self.poll.live_traffic_ms.to_string(),
            "poll.health_ms" => self.poll.health_ms.to_string(),
            "poll.metrics_ms" => self.poll.metrics_ms.to_string(),
            "poll.admin_ms" => self.poll.admin_ms.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Admin token store for the configured mode.
    ///
    /// Simulated tokens are only valid inside the process that issued them,
    /// so they are never written to `~/.sentinel/admin_token`.
    pub fn token_storage(&self) -> Arc<dyn TokenStorage> {
        match self.mode {
            DataMode::Live => Arc::new(FileTokenStorage::default_location()),
            DataMode::Simulation => Arc::new(MemoryTokenStorage::new()),
        }
    }

    /// Backend for the configured mode
    pub fn connect(&self, credentials: Arc<Credentials>) -> ConsoleResult<Arc<dyn SoarApi>> {
        match self.mode {
            DataMode::Live => {
                tracing::debug!(api_url = %self.api_url, "using live backend");
                let client = ApiClient::new(&self.api_url, credentials, self.request_timeout())?;
                Ok(Arc::new(client))
            }
            DataMode::Simulation => {
                tracing::debug!(seed = ?self.simulation_seed, "using simulated backend");
                Ok(Arc::new(SimulatedApi::new(credentials, self.simulation_seed)))
            }
        }
    }
}
