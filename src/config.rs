use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/upload/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where the analysis service lives and where local state is kept.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub endpoint: Url,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        value: raw.to_string(),
        source,
    })
}

pub fn parse_timeout_secs(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidNumber {
            key: "CHEMVIZ_TIMEOUT_SECS",
            value: raw.to_string(),
        }),
    }
}

pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("", "", "chemviz")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

impl ServiceConfig {
    /// Reads `CHEMVIZ_API_URL`, `CHEMVIZ_TIMEOUT_SECS` and `CHEMVIZ_DATA_DIR`,
    /// picking up a `.env` file first when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let endpoint = match env_value("CHEMVIZ_API_URL") {
            Some(raw) => parse_endpoint(&raw)?,
            None => parse_endpoint(DEFAULT_API_URL)?,
        };
        let timeout = match env_value("CHEMVIZ_TIMEOUT_SECS") {
            Some(raw) => parse_timeout_secs(&raw)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        let data_dir = match env_value("CHEMVIZ_DATA_DIR") {
            Some(raw) => PathBuf::from(raw),
            None => default_data_dir()?,
        };

        Ok(Self {
            endpoint,
            timeout,
            data_dir,
        })
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("settings").join("preferences.json")
    }
}
