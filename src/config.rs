use anyhow::{anyhow, Result};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::pairing::{MockTransportOptions, PairingOptions, MAX_QR_ATTEMPTS};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("demo_connect_on_attempt must be between 1 and {max}, got {value}")]
    InvalidConnectAttempt { value: u8, max: u8 },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Local tool settings. Missing keys take their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub settle_delay_ms: u64,
    pub qr_initial_delay_ms: u64,
    pub qr_refresh_secs: u64,
    /// Mock transport pretends the user scanned this QR attempt. Null turns it off.
    pub demo_connect_on_attempt: Option<u8>,
    pub demo_connect_delay_secs: u64,
    pub toast_timeout_secs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            settle_delay_ms: 2000,
            qr_initial_delay_ms: 1500,
            qr_refresh_secs: 45,
            demo_connect_on_attempt: Some(3),
            demo_connect_delay_secs: 10,
            toast_timeout_secs: 5,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn pairing_options(&self) -> PairingOptions {
        PairingOptions {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn mock_options(&self) -> MockTransportOptions {
        MockTransportOptions {
            initial_delay: Duration::from_millis(self.qr_initial_delay_ms),
            qr_interval: Duration::from_secs(self.qr_refresh_secs),
            connect_on_attempt: self.demo_connect_on_attempt,
            connect_delay: Duration::from_secs(self.demo_connect_delay_secs),
        }
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level_filter()?;
        if self.qr_refresh_secs == 0 {
            return Err(ConfigError::ZeroDuration("qr_refresh_secs"));
        }
        if self.toast_timeout_secs <= 0 {
            return Err(ConfigError::ZeroDuration("toast_timeout_secs"));
        }
        if let Some(n) = self.demo_connect_on_attempt {
            // the last attempt fails the session before a scan could land
            if n == 0 || n >= MAX_QR_ATTEMPTS {
                return Err(ConfigError::InvalidConnectAttempt {
                    value: n,
                    max: MAX_QR_ATTEMPTS - 1,
                });
            }
        }
        Ok(())
    }
}

static CONFIG_PATH_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Point the config loader at a specific file. Only the first call wins.
pub fn set_config_path_override(path: PathBuf) -> bool {
    CONFIG_PATH_OVERRIDE.set(path).is_ok()
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("gateboard");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn get_config_path() -> Result<PathBuf> {
    if let Some(path) = CONFIG_PATH_OVERRIDE.get() {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("config.json"))
}

/// Load the config, writing out the defaults on first run
pub fn load_config() -> Result<GatewayConfig> {
    let path = get_config_path()?;
    let config = load_config_from(&path)?;
    if !path.exists() {
        save_config(&config)?;
    }
    Ok(config)
}

pub fn save_config(config: &GatewayConfig) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

/// Defaults when the file does not exist
pub fn load_config_from(path: &Path) -> Result<GatewayConfig> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(GatewayConfig::default());
    }

    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config: GatewayConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    info!("Loaded config from {}", path.display());

    Ok(config)
}

pub fn save_config_to(path: &Path, config: &GatewayConfig) -> Result<()> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, config)?;

    info!("Config saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pairing_options().settle_delay, Duration::from_millis(2000));
        let mock = config.mock_options();
        assert_eq!(mock.initial_delay, Duration::from_millis(1500));
        assert_eq!(mock.qr_interval, Duration::from_secs(45));
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = GatewayConfig {
            log_level: "loud".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidLogLevel("loud".to_string())));

        config.log_level = "debug".to_string();
        config.demo_connect_on_attempt = Some(MAX_QR_ATTEMPTS);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConnectAttempt { .. })));

        config.demo_connect_on_attempt = None;
        config.qr_refresh_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration("qr_refresh_secs")));
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let config: GatewayConfig = serde_json::from_str(r#"{"qr_refresh_secs": 20}"#).unwrap();
        assert_eq!(config.qr_refresh_secs, 20);
        assert_eq!(config.settle_delay_ms, 2000);
        assert_eq!(config.demo_connect_on_attempt, Some(3));
    }
}
