//! Runtime configuration
//!
//! Everything lives under one data directory (`~/.courier` unless
//! `COURIER_HOME` is set). An optional `config.yaml` there overrides the
//! defaults below; a missing file is not an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_NAME, APP_VERSION, CONFIG_FILE, DATA_DIR_ENV, DATA_DIR_NAME, DEFAULT_LOG_FILE,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Where records, globals and the log file are written
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Log file name, relative to `data_dir`
    pub log_file: String,
    pub user_agent: String,
    /// Skip TLS certificate validation (self-signed dev servers)
    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: data_dir_from_env(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            user_agent: format!("{}/{}", APP_NAME, APP_VERSION),
            accept_invalid_certs: false,
        }
    }
}

/// `$COURIER_HOME`, else `~/.courier`, else `./.courier`
pub fn data_dir_from_env() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME),
    }
}

impl Config {
    /// Load from the default data directory
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(data_dir_from_env())
    }

    pub fn load_from(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.into();
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        config.data_dir = data_dir;
        Ok(config)
    }

    /// Parse YAML; omitted keys take their defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_str("accept_invalid_certs: true\n").unwrap();
        assert!(config.accept_invalid_certs);
        assert_eq!(config.log_file, DEFAULT_LOG_FILE);
        assert!(config.user_agent.starts_with("courier/"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.log_path(), dir.path().join(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_file_overrides() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "user_agent: probe/1\nlog_file: debug.log\n",
        )
        .unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.user_agent, "probe/1");
        assert_eq!(config.log_path(), dir.path().join("debug.log"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "user_agent: [unclosed\n").unwrap();
        assert!(Config::load_from(dir.path()).is_err());
    }
}
