use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TaqwaError};

/// Global taqwa configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Calculation convention passed to the timing service (3 = Muslim World League)
    #[serde(default = "default_method")]
    pub method: u8,

    /// Base URL of the Aladhan-compatible timing API
    #[serde(default = "default_timings_base_url")]
    pub timings_base_url: String,

    /// Base URL of the Nominatim-compatible reverse geocoder
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,

    /// How long to wait for a position fix
    #[serde(default = "default_gps_timeout_ms")]
    pub gps_timeout_ms: u64,

    /// How long to wait for a city/country name
    #[serde(default = "default_geocoding_timeout_ms")]
    pub geocoding_timeout_ms: u64,

    /// A cached location younger than this is used without asking for a new fix
    #[serde(default = "default_fresh_window_secs")]
    pub fresh_window_secs: u64,

    #[serde(default)]
    pub geolocation: GeolocationConfig,

    /// Where prayer alerts are delivered
    #[serde(default)]
    pub notify: NotifyTarget,

    /// Command run when the adhan should play (e.g. "paplay ~/adhan.ogg")
    #[serde(default)]
    pub adhan_command: Option<String>,
}

/// Where device coordinates come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// User consent for position lookups; `false` behaves like a denied prompt
    #[serde(default = "default_true")]
    pub allow: bool,

    #[serde(flatten)]
    pub source: GeolocationSource,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            allow: true,
            source: GeolocationSource::Ip { url: None },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum GeolocationSource {
    /// Approximate position from the public IP address
    Ip { url: Option<String> },
    /// A fixed position, for machines that never move
    Fixed { latitude: f64, longitude: f64 },
    /// No position source at all
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyTarget {
    /// Native desktop notifications
    #[default]
    Desktop,
    Ntfy { topic: String, server: Option<String> },
    /// Custom command, alert JSON on stdin
    Command { command: String },
}

fn default_true() -> bool {
    true
}

fn default_method() -> u8 {
    3
}

fn default_timings_base_url() -> String {
    "https://api.aladhan.com/v1".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_gps_timeout_ms() -> u64 {
    7000
}

fn default_geocoding_timeout_ms() -> u64 {
    4000
}

fn default_fresh_window_secs() -> u64 {
    3600 // 1 hour
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: default_method(),
            timings_base_url: default_timings_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            gps_timeout_ms: default_gps_timeout_ms(),
            geocoding_timeout_ms: default_geocoding_timeout_ms(),
            fresh_window_secs: default_fresh_window_secs(),
            geolocation: GeolocationConfig::default(),
            notify: NotifyTarget::default(),
            adhan_command: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn gps_timeout(&self) -> Duration {
        Duration::from_millis(self.gps_timeout_ms)
    }

    pub fn geocoding_timeout(&self) -> Duration {
        Duration::from_millis(self.geocoding_timeout_ms)
    }

    pub fn fresh_window(&self) -> Duration {
        Duration::from_secs(self.fresh_window_secs)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "taqwa")
            .ok_or_else(|| TaqwaError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "taqwa")
            .ok_or_else(|| TaqwaError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports TAQWA_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("TAQWA_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("taqwa.db"))
    }
}
