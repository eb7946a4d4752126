#![forbid(unsafe_code)]

//! Service configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dispatch::DispatchConfig;
use crate::error::Error;

/// Where the registry database lives, where the API binds, and how
/// dispatch is bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_filename: String,
    pub api: ApiConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Config {
    /// Fails when no platform data directory can be determined; `Default`
    /// falls back to `./data` instead.
    pub fn new() -> Result<Self, Error> {
        let data_dir = platform_data_dir().ok_or_else(|| {
            Error::Config("no platform data directory; pass --data-dir or set $HOME".to_string())
        })?;
        Ok(Self::with_defaults(data_dir))
    }

    fn with_defaults(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            db_filename: "pitchside.db".into(),
            api: ApiConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }

    pub fn with_data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = path;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_filename)
    }

    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = platform_data_dir().unwrap_or_else(|| {
            let fallback = PathBuf::from("./data");
            tracing::warn!(
                path = %fallback.display(),
                "no platform data directory, falling back to ./data"
            );
            fallback
        });
        Self::with_defaults(data_dir)
    }
}

fn platform_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("club", "futsal", "pitchside").map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.db_filename, "pitchside.db");
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.dispatch.batch_size, 500);
    }

    #[test]
    fn test_db_path_under_data_dir() {
        let config = Config::default().with_data_dir(PathBuf::from("/var/lib/pitchside"));
        assert_eq!(
            config.db_path(),
            PathBuf::from("/var/lib/pitchside/pitchside.db")
        );
    }
}
