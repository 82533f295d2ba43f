//! Run configuration, loaded from YAML or taken from defaults.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```yaml
//! center: [27.717245, 85.32396]
//! radius_m: 12000
//! parameters: [pm25, pm10]
//! output:
//!   mode: stream
//!   path: kathmandu_by_sensor.ndjson
//! ```

use crate::api::client::DEFAULT_BASE_URL;
use crate::types::location::LatLon;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "OPENAQ_API_KEY";

/// File format of the buffered table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Csv,
    Parquet,
}

/// Output mode. Exactly one is active per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum OutputConfig {
    /// Buffer every row and write one table at the end.
    Table {
        path: PathBuf,
        #[serde(default)]
        format: TableFormat,
    },
    /// Append each row to a newline-delimited JSON file as it is produced.
    Stream { path: PathBuf },
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig::Table {
            path: PathBuf::from("kathmandu_by_sensor.csv"),
            format: TableFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Sent as `X-API-Key`. Falls back to `OPENAQ_API_KEY` when unset.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Search center as `[latitude, longitude]`.
    pub center: LatLon,
    pub radius_m: u32,
    pub location_page_limit: usize,
    pub measurement_page_limit: usize,
    /// Fixed pause between consecutive page requests.
    pub request_delay_ms: u64,
    pub listing_timeout_secs: u64,
    pub measurement_timeout_secs: u64,
    /// Measured parameters to request. Empty requests all of them.
    pub parameters: Vec<String>,
    pub chunk_days: u32,
    pub lookback_days: u32,
    pub output: OutputConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            center: LatLon(27.717245, 85.323960),
            radius_m: 12_000,
            location_page_limit: 100,
            measurement_page_limit: 1000,
            request_delay_ms: 250,
            listing_timeout_secs: 30,
            measurement_timeout_secs: 60,
            parameters: vec!["pm25".to_string(), "pm10".to_string()],
            chunk_days: 30,
            lookback_days: 365 * 2,
            output: OutputConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Fills `api_key` from the environment when the config left it empty.
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            self.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let LatLon(lat, lon) = self.center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ConfigError::ValidationError(format!(
                "center ({}, {}) is not a valid coordinate",
                lat, lon
            )));
        }
        if self.radius_m == 0 {
            return Err(ConfigError::ValidationError(
                "radius_m must be positive".into(),
            ));
        }
        if self.location_page_limit == 0 || self.measurement_page_limit == 0 {
            return Err(ConfigError::ValidationError(
                "page limits must be positive".into(),
            ));
        }
        if self.chunk_days == 0 || self.lookback_days == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_days and lookback_days must be positive".into(),
            ));
        }
        let earliest = chrono::Utc::now().checked_sub_signed(self.lookback());
        if earliest.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "lookback_days {} reaches past the earliest representable date",
                self.lookback_days
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("base_url is empty".into()));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn measurement_timeout(&self) -> Duration {
        Duration::from_secs(self.measurement_timeout_secs)
    }

    pub fn chunk_size(&self) -> ChronoDuration {
        ChronoDuration::days(i64::from(self.chunk_days))
    }

    pub fn lookback(&self) -> ChronoDuration {
        ChronoDuration::days(i64::from(self.lookback_days))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
