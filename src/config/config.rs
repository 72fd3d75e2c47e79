// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::container::WaitPolicy;
use crate::gateway::GatewaySettings;

const ENV_PREFIX: &str = "MAP_BRIDGE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("Unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host bridge bind address (e.g., "127.0.0.1:8080")
    pub local_api_bind: SocketAddr,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_format: LogFormat,

    /// Geocoder HTTP endpoint
    pub geocoder_url: String,

    /// Suggest HTTP endpoint
    pub suggest_url: String,

    /// Geocoder API key
    pub api_key: Option<String>,

    /// Suggest API key; the geocoder key is used when unset
    pub suggest_api_key: Option<String>,

    /// Timeout for geocoder and suggest requests
    pub request_timeout_secs: u64,

    pub container_poll_interval_ms: u64,

    /// How long initialize waits for the map container before failing
    pub container_wait_timeout_secs: u64,

    /// Animation length when a view operation passes none or zero
    pub default_animation_ms: u64,
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("MAP_BRIDGE_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from(Path::new(&config_path))?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply `MAP_BRIDGE_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(val) = var("LOCAL_API_BIND") {
            self.local_api_bind = SocketAddr::from_str(&val)?;
        }
        if let Some(val) = var("LOG_LEVEL") {
            self.log_level = val;
        }
        if let Some(val) = var("LOG_FORMAT") {
            self.log_format = val.parse()?;
        }
        if let Some(val) = var("GEOCODER_URL") {
            self.geocoder_url = val;
        }
        if let Some(val) = var("SUGGEST_URL") {
            self.suggest_url = val;
        }
        if let Some(val) = var("API_KEY") {
            self.api_key = Some(val);
        }
        if let Some(val) = var("SUGGEST_API_KEY") {
            self.suggest_api_key = Some(val);
        }
        if let Some(val) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = val.parse()?;
        }
        if let Some(val) = var("CONTAINER_POLL_INTERVAL_MS") {
            self.container_poll_interval_ms = val.parse()?;
        }
        if let Some(val) = var("CONTAINER_WAIT_TIMEOUT_SECS") {
            self.container_wait_timeout_secs = val.parse()?;
        }
        if let Some(val) = var("DEFAULT_ANIMATION_MS") {
            self.default_animation_ms = val.parse()?;
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            default_animation: Duration::from_millis(self.default_animation_ms),
            container_wait: WaitPolicy {
                poll_interval: Duration::from_millis(self.container_poll_interval_ms),
                timeout: Duration::from_secs(self.container_wait_timeout_secs),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_api_bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            log_level: String::from("info"),
            log_format: LogFormat::Pretty,
            geocoder_url: String::from("https://geocode-maps.yandex.ru/1.x/"),
            suggest_url: String::from("https://suggest-maps.yandex.ru/v1/suggest"),
            api_key: None,
            suggest_api_key: None,
            request_timeout_secs: 10,
            container_poll_interval_ms: 100,
            container_wait_timeout_secs: 30,
            default_animation_ms: 300,
        }
    }
}
