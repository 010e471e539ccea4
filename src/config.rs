//! Run configuration: API keys, cities, fetch mode and output location.

use crate::clients::retry_client::RetryPolicy;
use crate::clients::{energy_client, weather_client};
use crate::types::city::{default_cities, City};
use bon::Builder;
use log::debug;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const NOAA_API_KEY: &str = "NOAA_API_KEY";
pub const EIA_API_KEY: &str = "EIA_API_KEY";
pub const FETCH_MODE: &str = "FETCH_MODE";
pub const DATA_DIR: &str = "GRIDPULSE_DATA_DIR";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("Unknown fetch mode '{0}' (expected 'history' or 'daily')")]
    InvalidFetchMode(String),
}

/// How much history a run pulls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    /// Backfill roughly a quarter of daily data.
    History,
    /// The latest week, enough for both sources to share at least the
    /// newest common day and the one before it despite publication lag.
    #[default]
    Daily,
}

impl FetchMode {
    /// Number of most recent days kept per city.
    pub fn retained_days(&self) -> usize {
        match self {
            FetchMode::History => 90,
            FetchMode::Daily => 7,
        }
    }
}

impl FromStr for FetchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "history" => Ok(FetchMode::History),
            "daily" => Ok(FetchMode::Daily),
            other => Err(ConfigError::InvalidFetchMode(other.to_string())),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::History => f.write_str("history"),
            FetchMode::Daily => f.write_str("daily"),
        }
    }
}

/// Whether quality findings are written per city or as one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportMode {
    #[default]
    PerCity,
    Aggregate,
}

/// Everything a pipeline run needs, resolved once up front.
///
/// ```
/// use gridpulse::{FetchMode, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .noaa_api_key("noaa".to_string())
///     .eia_api_key("eia".to_string())
///     .fetch_mode(FetchMode::History)
///     .build();
/// assert_eq!(config.cities.len(), 5);
/// assert_eq!(config.data_dir.to_str(), Some("data"));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct PipelineConfig {
    pub noaa_api_key: String,
    pub eia_api_key: String,
    #[builder(default = default_cities())]
    pub cities: Vec<City>,
    #[builder(default)]
    pub fetch_mode: FetchMode,
    #[builder(default)]
    pub report_mode: ReportMode,
    #[builder(default)]
    pub retry: RetryPolicy,
    #[builder(default = PathBuf::from("data"))]
    pub data_dir: PathBuf,
    #[builder(default = weather_client::DEFAULT_PAGE_SIZE)]
    pub weather_page_size: usize,
    #[builder(default = weather_client::DEFAULT_MAX_PAGES)]
    pub weather_max_pages: usize,
    #[builder(default = energy_client::DEFAULT_PAGE_SIZE)]
    pub energy_page_size: usize,
    #[builder(default = energy_client::DEFAULT_MAX_PAGES)]
    pub energy_max_pages: usize,
}

impl PipelineConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let noaa_api_key = get(NOAA_API_KEY).ok_or(ConfigError::MissingEnv(NOAA_API_KEY))?;
        let eia_api_key = get(EIA_API_KEY).ok_or(ConfigError::MissingEnv(EIA_API_KEY))?;
        let fetch_mode = get(FETCH_MODE)
            .map(|raw| raw.parse::<FetchMode>())
            .transpose()?
            .unwrap_or_default();
        let data_dir = get(DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        Ok(Self::builder()
            .noaa_api_key(noaa_api_key)
            .eia_api_key(eia_api_key)
            .fetch_mode(fetch_mode)
            .data_dir(data_dir)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn fetch_mode_parses_case_insensitively() {
        assert_eq!("History".parse::<FetchMode>(), Ok(FetchMode::History));
        assert_eq!(" daily ".parse::<FetchMode>(), Ok(FetchMode::Daily));
        assert_eq!(
            "weekly".parse::<FetchMode>(),
            Err(ConfigError::InvalidFetchMode("weekly".into()))
        );
    }

    #[test]
    fn defaults_to_daily_mode_and_data_dir() {
        let config =
            PipelineConfig::from_lookup(lookup(&[(NOAA_API_KEY, "n"), (EIA_API_KEY, "e")]))
                .unwrap();
        assert_eq!(config.fetch_mode, FetchMode::Daily);
        assert_eq!(config.report_mode, ReportMode::PerCity);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn reads_mode_and_directory() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (NOAA_API_KEY, "n"),
            (EIA_API_KEY, "e"),
            (FETCH_MODE, "history"),
            (DATA_DIR, "/tmp/gridpulse"),
        ]))
        .unwrap();
        assert_eq!(config.fetch_mode, FetchMode::History);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/gridpulse"));
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        let err = PipelineConfig::from_lookup(lookup(&[(NOAA_API_KEY, "n"), (EIA_API_KEY, " ")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingEnv(EIA_API_KEY));
    }
}
