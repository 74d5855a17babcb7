use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_ENV: &str = "RETROGIT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
}

/// How far apart consecutive commits are spread, in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_interval_days")]
    pub interval_days: f64,
    #[serde(default = "default_randomness_days")]
    pub randomness_days: f64,
    /// Lookback used when the repository has no commits yet.
    #[serde(default = "default_initial_backdate_days")]
    pub initial_backdate_days: f64,
}

fn default_interval_days() -> f64 {
    3.0
}

fn default_randomness_days() -> f64 {
    1.0
}

fn default_initial_backdate_days() -> f64 {
    30.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval_days(),
            randomness_days: default_randomness_days(),
            initial_backdate_days: default_initial_backdate_days(),
        }
    }
}

impl TimingConfig {
    /// Reject values the scheduler cannot work with.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        positive("interval_days", self.interval_days)?;
        finite("randomness_days", self.randomness_days)?;
        if self.randomness_days < 0.0 {
            return Err(Error::InvalidConfig {
                field: "randomness_days",
                reason: format!("must not be negative (got {})", self.randomness_days),
            });
        }
        positive("initial_backdate_days", self.initial_backdate_days)?;
        Ok(())
    }

    /// Whether jitter can push a commit before its predecessor.
    pub fn allows_backwards_steps(&self) -> bool {
        self.randomness_days >= self.interval_days
    }
}

fn finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            reason: format!("must be a finite number (got {value})"),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(Error::InvalidConfig {
            field,
            reason: format!("must be greater than zero (got {value})"),
        });
    }
    Ok(())
}

impl Config {
    /// Resolve the config file location.
    ///
    /// `RETROGIT_CONFIG` wins, then `$XDG_CONFIG_HOME/retrogit/config.toml`,
    /// then the platform config directory, then `~/.retrogit.toml`.
    pub fn locate() -> Result<PathBuf> {
        if let Some(path) = Self::env_override() {
            return Ok(path);
        }

        if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(xdg).join("retrogit").join("config.toml"));
        }

        if let Some(dir) = dirs::config_dir() {
            return Ok(dir.join("retrogit").join("config.toml"));
        }

        dirs::home_dir()
            .map(|home| home.join(".retrogit.toml"))
            .ok_or(Error::NoConfigDir)
    }

    /// Path named by `RETROGIT_CONFIG`, if set and non-empty.
    pub fn env_override() -> Option<PathBuf> {
        env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Load and validate the config at `path`, falling back to defaults
    /// when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        config.timing.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
