// src/config/alert.rs
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::notify::{parse_channel_list, telegram::DEFAULT_API_BASE, ChannelTarget};

/// Optional TOML file read before the environment.
pub const ENV_CONFIG_PATH: &str = "SEISMIC_ALERT_CONFIG";

pub const DEFAULT_FEED_ENDPOINT: &str = "https://www.seismicportal.eu/fdsnws/event/1/query";

fn default_min_magnitude() -> f64 {
    6.0
}
fn default_poll_interval_secs() -> u64 {
    1800
}
fn default_feed_endpoint() -> String {
    DEFAULT_FEED_ENDPOINT.to_string()
}
fn default_feed_limit() -> u32 {
    10
}
fn default_store_path() -> PathBuf {
    PathBuf::from("sismos_notificados.json")
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_telegram_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Everything the alert subsystem needs, built once at startup.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel_ids: Vec<ChannelTarget>,
    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: f64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_feed_endpoint")]
    pub feed_endpoint: String,
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u32,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
    /// Status/metrics listener; disabled when unset.
    #[serde(default)]
    pub http_addr: Option<SocketAddr>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_ids: Vec::new(),
            min_magnitude: default_min_magnitude(),
            poll_interval_secs: default_poll_interval_secs(),
            feed_endpoint: default_feed_endpoint(),
            feed_limit: default_feed_limit(),
            store_path: default_store_path(),
            request_timeout_secs: default_request_timeout_secs(),
            telegram_api_base: default_telegram_api_base(),
            http_addr: None,
        }
    }
}

// Hand-written so the bot token never ends up in logs.
impl fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertConfig")
            .field("bot_token", &format_args!("<{} chars>", self.bot_token.len()))
            .field("channel_ids", &self.channel_ids)
            .field("min_magnitude", &self.min_magnitude)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("feed_endpoint", &self.feed_endpoint)
            .field("feed_limit", &self.feed_limit)
            .field("store_path", &self.store_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("http_addr", &self.http_addr)
            .finish()
    }
}

impl AlertConfig {
    /// Load using:
    /// 1) TOML file at $SEISMIC_ALERT_CONFIG (if set)
    /// 2) environment variables on top
    ///
    /// then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::from_file(Path::new(&p))?,
            Err(_) => Self::default(),
        };
        cfg.apply_vars(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values from a variable lookup. Blank values are ignored.
    pub fn apply_vars<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BOT_TOKEN") {
            self.bot_token = v.trim().to_string();
        }
        if let Some(v) = get("ALERTA_SISMOS_CHANNEL_IDS") {
            self.channel_ids = parse_channel_list(&v);
        }
        if let Some(v) = get("MIN_MAGNITUDE_ALERTA") {
            self.min_magnitude = parse_var("MIN_MAGNITUDE_ALERTA", v)?;
        }
        if let Some(v) = get("INTERVALO_VERIFICACAO") {
            self.poll_interval_secs = parse_var("INTERVALO_VERIFICACAO", v)?;
        }
        if let Some(v) = get("SISMOS_API") {
            self.feed_endpoint = v.trim().to_string();
        }
        if let Some(v) = get("SEISMIC_LIMIT") {
            self.feed_limit = parse_var("SEISMIC_LIMIT", v)?;
        }
        if let Some(v) = get("ALERT_STORE_PATH") {
            self.store_path = PathBuf::from(v.trim());
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = get("TELEGRAM_API_BASE") {
            self.telegram_api_base = v.trim().to_string();
        }
        if let Some(v) = get("ALERT_HTTP_ADDR") {
            self.http_addr = Some(parse_var("ALERT_HTTP_ADDR", v)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.is_empty() {
            return Err(ConfigError::Missing("BOT_TOKEN"));
        }
        if self.channel_ids.is_empty() {
            return Err(ConfigError::Missing("ALERTA_SISMOS_CHANNEL_IDS"));
        }
        if self.feed_endpoint.is_empty() {
            return Err(ConfigError::Missing("SISMOS_API"));
        }
        if !self.min_magnitude.is_finite() || self.min_magnitude < 0.0 {
            return Err(invalid(
                "MIN_MAGNITUDE_ALERTA",
                self.min_magnitude,
                "must be a non-negative number",
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("INTERVALO_VERIFICACAO", 0, "must be at least 1 second"));
        }
        if self.feed_limit == 0 {
            return Err(invalid("SEISMIC_LIMIT", 0, "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", 0, "must be at least 1 second"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, &raw, e.to_string()))
}

fn invalid(key: &'static str, value: impl fmt::Display, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}
