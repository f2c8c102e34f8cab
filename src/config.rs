use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "staleclean";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub clean: CleanConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_threshold_days")]
    pub default_threshold_days: u32,
}

fn default_threshold_days() -> u32 {
    30
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_threshold_days: default_threshold_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    #[serde(default = "default_true")]
    pub dry_run_by_default: bool,
    #[serde(default = "default_true")]
    pub log_history: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            dry_run_by_default: true,
            log_history: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the user config, writing the defaults out on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Apply a `config set` pair.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "threshold_days" => self.scan.default_threshold_days = value.parse()?,
            "log_history" => self.clean.log_history = value.parse()?,
            "dry_run_by_default" => self.clean.dry_run_by_default = value.parse()?,
            "log_level" => self.log.level = value.to_string(),
            _ => bail!(
                "unknown key: {} (available: threshold_days, log_history, dry_run_by_default, log_level)",
                key
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.scan.default_threshold_days, 30);
        assert!(path.exists());
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scan]\ndefault_threshold_days = 90\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.scan.default_threshold_days, 90);
        assert!(config.clean.log_history);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn set_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();

        config.set("threshold_days", "180").unwrap();
        config.set("log_history", "false").unwrap();
        config.set("log_level", "debug").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.scan.default_threshold_days, 180);
        assert!(!loaded.clean.log_history);
        assert_eq!(loaded.log.level, "debug");
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert!(config.set("min_size", "1").is_err());
        assert!(config.set("threshold_days", "-3").is_err());
    }
}
