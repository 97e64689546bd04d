//! Configuration file support for Stepring.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/stepring/config.toml`.

use crate::{DailyTarget, Error, Result, TargetOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub targets: TargetsConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Daily target picker configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_target_options")]
    pub options: Vec<u64>,

    #[serde(default = "default_target")]
    pub default: u64,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            options: default_target_options(),
            default: default_target(),
        }
    }
}

/// Health store access configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Grant scopes on first request instead of denying them
    #[serde(default = "default_auto_grant")]
    pub auto_grant: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout_ms(),
            auto_grant: default_auto_grant(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("stepring")
}

fn default_target_options() -> Vec<u64> {
    vec![5_000, 10_000, 15_000, 20_000]
}

fn default_target() -> u64 {
    5_000
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_auto_grant() -> bool {
    true
}

impl TargetsConfig {
    /// Convert to the validated picker options
    pub fn to_options(&self) -> Result<TargetOptions> {
        TargetOptions::new(
            self.options.iter().copied().map(DailyTarget).collect(),
            DailyTarget(self.default),
        )
    }
}

impl HealthConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults can't express
    pub fn validate(&self) -> Result<()> {
        self.targets.to_options()?;
        if self.health.query_timeout_ms == 0 {
            return Err(Error::Config("health.query_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("stepring").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
