use error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod error;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    pub bind_address: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub tick_rate_hz: f64,
    pub keyframe_interval: u64,
    pub snapshot_history: usize,
    pub prediction_history: usize,
    pub reconcile_epsilon: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:40000".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "pong-netcode".to_string(),
            tick_rate_hz: 60.0,
            keyframe_interval: 20,
            snapshot_history: 256,
            prediction_history: 120,
            reconcile_epsilon: 0.5,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "0.0.0.0:9091".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            server: ServerConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if SocketAddr::from_str(&self.network.bind_address).is_err() {
            return Err(ConfigError::Validation {
                reason: format!(
                    "invalid network bind_address '{}', expected 'IP:PORT'",
                    self.network.bind_address
                ),
            });
        }

        if self.metrics.enabled && SocketAddr::from_str(&self.metrics.bind_address).is_err() {
            return Err(ConfigError::Validation {
                reason: format!(
                    "invalid metrics bind_address '{}', expected 'IP:PORT'",
                    self.metrics.bind_address
                ),
            });
        }

        if self.server.name.trim().is_empty() {
            return Err(ConfigError::Validation {
                reason: "server name cannot be empty".to_string(),
            });
        }

        if self.server.tick_rate_hz <= 0.0 {
            return Err(ConfigError::Validation {
                reason: "tick_rate_hz must be greater than 0".to_string(),
            });
        }

        if self.server.keyframe_interval == 0 {
            return Err(ConfigError::Validation {
                reason: "keyframe_interval must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Loads `config.toml` from the working directory, writing out defaults the
/// first time it is missing. A present-but-invalid file is a hard failure —
/// it is never silently overwritten.
pub fn handle() -> Result<Config, ConfigError> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    if config_path.exists() {
        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    } else {
        let config = Config::default();
        save(&config, &config_path)?;
        Ok(config)
    }
}

fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let config_content = toml::to_string_pretty(config)?;
    let mut file = fs::File::create(path)?;
    file.write_all(config_content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_unparsable_bind_address() {
        let mut config = Config::default();
        config.network.bind_address = "not-an-address".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_zero_keyframe_interval() {
        let mut config = Config::default();
        config.server.keyframe_interval = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_empty_server_name() {
        let mut config = Config::default();
        config.server.name = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }
}
