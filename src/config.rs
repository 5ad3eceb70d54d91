use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::lorawan::{DevAddr, SessionKey, SessionKeys};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub uplink: UplinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-device session parameters, as provisioned by the network server.
/// There are deliberately no defaults: keys and address always come from
/// the caller's configuration.
#[derive(Deserialize)]
pub struct DeviceConfig {
    /// Device address, 8 hex digits MSB-first (e.g. "260B7AC6")
    pub dev_addr: String,
    /// Network session key, 32 hex digits
    pub nwk_s_key: String,
    /// Application session key, 32 hex digits
    pub app_s_key: String,
}

impl DeviceConfig {
    pub fn dev_addr(&self) -> anyhow::Result<DevAddr> {
        DevAddr::from_hex(&self.dev_addr)
            .map_err(|e| anyhow::anyhow!("Invalid dev_addr '{}': {}", self.dev_addr, e))
    }

    pub fn session_keys(&self) -> anyhow::Result<SessionKeys> {
        Ok(SessionKeys {
            nwk_s_key: SessionKey::from_hex(&self.nwk_s_key)
                .map_err(|e| anyhow::anyhow!("Invalid nwk_s_key: {}", e))?,
            app_s_key: SessionKey::from_hex(&self.app_s_key)
                .map_err(|e| anyhow::anyhow!("Invalid app_s_key: {}", e))?,
        })
    }
}

// Keys stay out of logs, so no derived Debug here.
impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("dev_addr", &self.dev_addr)
            .field("nwk_s_key", &"****")
            .field("app_s_key", &"****")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct UplinkConfig {
    /// Default FPort when the CLI does not override it
    #[serde(default = "default_f_port")]
    pub f_port: u8,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            f_port: default_f_port(),
        }
    }
}

fn default_f_port() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}
