use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// ZeroMQ PUB endpoint of the signal daemon.
    #[serde(default = "FeedConfig::default_endpoint")]
    pub endpoint: String,
}

impl FeedConfig {
    fn default_endpoint() -> String { "tcp://127.0.0.1:9090".into() }

    /// `CARHMI_FEED` overrides the configured endpoint.
    pub fn resolved_endpoint(&self) -> String {
        std::env::var("CARHMI_FEED").unwrap_or_else(|_| self.endpoint.clone())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "PlayerConfig::default_host")]
    pub host: String,
    #[serde(default = "PlayerConfig::default_port")]
    pub port: u16,
    #[serde(default = "PlayerConfig::default_timeout")]
    pub timeout_ms: u64,
}

impl PlayerConfig {
    fn default_host() -> String { "127.0.0.1".into() }
    fn default_port() -> u16 { 6600 }
    fn default_timeout() -> u64 { 5000 }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            timeout_ms: Self::default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_shutdown")]
    pub shutdown_command: Vec<String>,
    #[serde(default = "SystemConfig::default_screen_toggle")]
    pub screen_toggle_command: Vec<String>,
    #[serde(default = "SystemConfig::default_timeout")]
    pub command_timeout_ms: u64,
}

impl SystemConfig {
    fn default_shutdown() -> Vec<String> {
        vec!["/sbin/init".into(), "0".into()]
    }

    // Android power key over adb
    fn default_screen_toggle() -> Vec<String> {
        ["/usr/local/bin/adb", "shell", "input", "keyevent", "26"]
            .into_iter()
            .map(Into::into)
            .collect()
    }

    fn default_timeout() -> u64 { 5000 }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            shutdown_command: Self::default_shutdown(),
            screen_toggle_command: Self::default_screen_toggle(),
            command_timeout_ms: Self::default_timeout(),
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("carhmi")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents).with_context(|| "parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.system.shutdown_command.is_empty() {
            anyhow::bail!("system.shutdown_command must not be empty");
        }
        if self.system.screen_toggle_command.is_empty() {
            anyhow::bail!("system.screen_toggle_command must not be empty");
        }
        Ok(())
    }
}
