use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::theme::THEME_NAMES;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "slidecast";

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_KEEPALIVE_SECS: u64 = 30;
pub const DEFAULT_QUEUE_CAPACITY: usize = crate::live::DEFAULT_QUEUE_CAPACITY;
pub const MAX_QUEUE_CAPACITY: usize = crate::live::relay::MAX_CAPACITY;

const VALID_KEYS: &str = "defaults.theme, defaults.port, defaults.motion, server.host, \
    server.keepalive_secs, server.queue_capacity, server.open_navigation";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_secs: Option<u64>,

    /// Events buffered per viewer before new ones are dropped for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,

    /// Let anyone drive shared slide navigation. Drawing still needs the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_navigation: Option<bool>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `slidecast config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# slidecast configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn theme(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.theme.as_deref())
            .unwrap_or("light")
    }

    pub fn port(&self) -> u16 {
        self.defaults.as_ref().and_then(|d| d.port).unwrap_or(DEFAULT_PORT)
    }

    pub fn motion(&self) -> bool {
        self.defaults.as_ref().and_then(|d| d.motion).unwrap_or(false)
    }

    pub fn host(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.host.as_deref())
            .unwrap_or(DEFAULT_HOST)
    }

    /// A hand-edited zero falls back to the default.
    pub fn keepalive_secs(&self) -> u64 {
        self.server
            .as_ref()
            .and_then(|s| s.keepalive_secs)
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_KEEPALIVE_SECS)
    }

    pub fn queue_capacity(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.queue_capacity)
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
            .min(MAX_QUEUE_CAPACITY)
    }

    pub fn open_navigation(&self) -> bool {
        self.server
            .as_ref()
            .and_then(|s| s.open_navigation)
            .unwrap_or(false)
    }

    /// Effective configuration with every default filled in.
    pub fn resolved(&self) -> Config {
        Config {
            defaults: Some(DefaultsConfig {
                theme: Some(self.theme().to_string()),
                port: Some(self.port()),
                motion: Some(self.motion()),
            }),
            server: Some(ServerConfig {
                host: Some(self.host().to_string()),
                keepalive_secs: Some(self.keepalive_secs()),
                queue_capacity: Some(self.queue_capacity()),
                open_navigation: Some(self.open_navigation()),
            }),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.theme" => {
                if !THEME_NAMES.contains(&value) {
                    anyhow::bail!(
                        "Invalid theme: {value}. Must be one of: {}.",
                        THEME_NAMES.join(", ")
                    );
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .theme = Some(value.to_string());
            }
            "defaults.port" => {
                let port = match value.parse::<u16>() {
                    Ok(port) if port > 0 => port,
                    _ => anyhow::bail!("Invalid port: {value}. Must be a number from 1 to 65535."),
                };
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .port = Some(port);
            }
            "defaults.motion" => {
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .motion = Some(parse_bool(key, value)?);
            }
            "server.host" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Invalid host: must not be empty.");
                }
                self.server.get_or_insert_with(ServerConfig::default).host =
                    Some(value.to_string());
            }
            "server.keepalive_secs" => {
                let secs = match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => secs,
                    _ => anyhow::bail!(
                        "Invalid keepalive_secs: {value}. Must be a positive number of seconds."
                    ),
                };
                self.server
                    .get_or_insert_with(ServerConfig::default)
                    .keepalive_secs = Some(secs);
            }
            "server.queue_capacity" => {
                let capacity = match value.parse::<usize>() {
                    Ok(n) if (1..=MAX_QUEUE_CAPACITY).contains(&n) => n,
                    _ => anyhow::bail!(
                        "Invalid queue_capacity: {value}. Must be a number from 1 to {MAX_QUEUE_CAPACITY}."
                    ),
                };
                self.server
                    .get_or_insert_with(ServerConfig::default)
                    .queue_capacity = Some(capacity);
            }
            "server.open_navigation" => {
                self.server
                    .get_or_insert_with(ServerConfig::default)
                    .open_navigation = Some(parse_bool(key, value)?);
            }
            _ => anyhow::bail!("Unknown config key: {key}. Valid keys: {VALID_KEYS}"),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid value for {key}: {value}. Must be 'true' or 'false'."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.theme(), "light");
        assert_eq!(config.port(), 5001);
        assert_eq!(config.keepalive_secs(), 30);
        assert_eq!(config.queue_capacity(), 64);
        assert!(!config.open_navigation());
    }

    #[test]
    fn test_set_valid_values() {
        let mut config = Config::default();
        config.set("defaults.theme", "dark").unwrap();
        config.set("defaults.port", "8080").unwrap();
        config.set("server.open_navigation", "true").unwrap();
        config.set("server.queue_capacity", "16").unwrap();
        assert_eq!(config.theme(), "dark");
        assert_eq!(config.port(), 8080);
        assert!(config.open_navigation());
        assert_eq!(config.queue_capacity(), 16);
    }

    #[test]
    fn test_set_rejects_invalid() {
        let mut config = Config::default();
        let err = config.set("defaults.theme", "neon").unwrap_err();
        assert!(err.to_string().contains("light, dark"));
        assert!(config.set("defaults.port", "0").is_err());
        assert!(config.set("server.keepalive_secs", "-1").is_err());
        assert!(config.set("server.open_navigation", "maybe").is_err());
        let err = config.set("defaults.aspect", "4:3").unwrap_err();
        assert!(err.to_string().contains("server.host"));
        assert!(config.defaults.is_none());
    }

    #[test]
    fn test_queue_capacity_is_bounded() {
        let mut config = Config::default();
        let err = config.set("server.queue_capacity", "4611686018427387904").unwrap_err();
        assert!(err.to_string().contains("65536"));
        assert!(config.set("server.queue_capacity", "0").is_err());
        config.set("server.queue_capacity", "65536").unwrap();
        assert_eq!(config.queue_capacity(), 65_536);
    }

    #[test]
    fn test_hand_edited_values_are_sanitized() {
        let config: Config = serde_yaml::from_str(
            "server:\n  keepalive_secs: 0\n  queue_capacity: 4611686018427387904\n",
        )
        .unwrap();
        assert_eq!(config.keepalive_secs(), DEFAULT_KEEPALIVE_SECS);
        assert_eq!(config.queue_capacity(), MAX_QUEUE_CAPACITY);

        let config: Config = serde_yaml::from_str("server:\n  queue_capacity: 0\n").unwrap();
        assert_eq!(config.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILENAME);
        let mut config = Config::default();
        config.set("server.host", "0.0.0.0").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.host(), "0.0.0.0");
        assert!(loaded.defaults.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join(FILENAME)).unwrap_err();
        assert!(err.to_string().contains("No config found"));
    }

    #[test]
    fn test_resolved_fills_defaults() {
        let yaml = serde_yaml::to_string(&Config::default().resolved()).unwrap();
        assert!(yaml.contains("keepalive_secs: 30"));
        assert!(yaml.contains("theme: light"));
    }
}
