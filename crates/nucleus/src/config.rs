//! Configuration management for the Nucleus console host.
//!
//! This module handles loading and validation of the host configuration from
//! TOML files. Framework tunables are embedded as-is from `nucleus_framework`.

use nucleus_framework::regions::RegionPriority;
use nucleus_framework::{CommandConfig, JailConfig, PluginManifest, RegionConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_plugin_name() -> String {
    "Nucleus".to_string()
}

fn default_worlds() -> Vec<String> {
    vec!["world".to_string()]
}

fn default_root_commands() -> Vec<String> {
    vec!["jail".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write default configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration loaded from TOML file.
///
/// Every section is optional in the file; missing sections take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Region watcher timing
    #[serde(default)]
    pub regions: RegionConfig,
    /// Command dispatcher settings
    #[serde(default)]
    pub commands: CommandConfig,
    /// Jail warden timing
    #[serde(default)]
    pub jail: JailConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Zones registered as event-listener regions at startup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<ZoneSettings>,
}

/// Host-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Plugin name; also the label of the default command root
    #[serde(default = "default_plugin_name")]
    pub name: String,
    /// Free text shown by the about command
    #[serde(default)]
    pub description: String,
    /// Labels registered as top-level commands
    #[serde(default = "default_root_commands")]
    pub commands: Vec<String>,
    /// Worlds the simulated host loads
    #[serde(default = "default_worlds")]
    pub worlds: Vec<String>,
    /// Server tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: default_plugin_name(),
            description: String::new(),
            commands: default_root_commands(),
            worlds: default_worlds(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// A cuboid zone announced to players who enter or leave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSettings {
    pub name: String,
    pub world: String,
    /// One corner, `[x, y, z]`
    pub min: [f64; 3],
    /// The opposite corner, `[x, y, z]`
    pub max: [f64; 3],
    #[serde(default)]
    pub enter_priority: RegionPriority,
    #[serde(default)]
    pub leave_priority: RegionPriority,
    /// Sent to players entering the zone
    #[serde(default)]
    pub enter_message: Option<String>,
    /// Sent to players leaving the zone
    #[serde(default)]
    pub leave_message: Option<String>,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// The manifest of the plugin hosted by this process.
    pub fn manifest(&self) -> PluginManifest {
        PluginManifest {
            name: self.server.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: self.server.description.clone(),
            authors: Vec::new(),
            commands: self.server.commands.clone(),
        }
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.name.trim().is_empty() {
            return Err("Server name cannot be empty".to_string());
        }

        if self.server.tick_interval_ms == 0 || self.server.tick_interval_ms > 1000 {
            return Err(format!(
                "Tick interval must be between 1 and 1000 ms, got {}",
                self.server.tick_interval_ms
            ));
        }

        if self.server.worlds.is_empty() {
            return Err("At least one world must be configured".to_string());
        }

        if self.regions.watcher_interval_ticks == 0 {
            return Err("regions.watcher_interval_ticks must be greater than 0".to_string());
        }

        if self.commands.help_page_size == 0 {
            return Err("commands.help_page_size must be greater than 0".to_string());
        }

        if self.jail.warden_interval_ticks == 0 {
            return Err("jail.warden_interval_ticks must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        let mut names = HashSet::new();
        for zone in &self.zones {
            if zone.name.trim().is_empty() {
                return Err("Zone names cannot be empty".to_string());
            }
            if !names.insert(zone.name.to_lowercase()) {
                return Err(format!("Zone '{}' is defined twice", zone.name));
            }
            if !self.server.worlds.contains(&zone.world) {
                return Err(format!("Zone '{}' is in unknown world '{}'", zone.name, zone.world));
            }
            if zone.min.iter().chain(zone.max.iter()).any(|c| !c.is_finite()) {
                return Err(format!("Zone '{}' has a non-finite corner", zone.name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    fn zone(name: &str, world: &str) -> ZoneSettings {
        ZoneSettings {
            name: name.to_string(),
            world: world.to_string(),
            min: [0.0, 0.0, 0.0],
            max: [10.0, 255.0, 10.0],
            enter_priority: RegionPriority::Default,
            leave_priority: RegionPriority::Default,
            enter_message: None,
            leave_message: None,
        }
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.name, "Nucleus");
        assert_eq!(config.server.commands, vec!["jail".to_string()]);
        assert_eq!(config.server.worlds, vec!["world".to_string()]);
        assert_eq!(config.server.tick_interval_ms, 50);
        assert_eq!(config.regions.watcher_interval_ticks, 3);
        assert_eq!(config.commands.help_page_size, 6);
        assert_eq!(config.jail.warden_interval_ticks, 1200);
        assert_eq!(config.logging.level, "info");
        assert!(config.zones.is_empty());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nucleus.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();

        assert_eq!(config.server.name, "Nucleus");
        assert!(path.exists());
        let written = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(written.server.tick_interval_ms, config.server.tick_interval_ms);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
name = "Prison"
commands = ["jail", "warp"]
tick_interval_ms = 25

[regions]
watcher_interval_ticks = 5

[logging]
level = "debug"

[[zones]]
name = "yard"
world = "world"
min = [0.0, 0.0, 0.0]
max = [32.0, 128.0, 32.0]
enter_priority = "high"
enter_message = "You entered the yard."
"#;
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();

        assert_eq!(config.server.name, "Prison");
        assert_eq!(config.server.tick_interval_ms, 25);
        assert_eq!(config.server.worlds, vec!["world".to_string()]);
        assert_eq!(config.regions.watcher_interval_ticks, 5);
        assert_eq!(config.regions.resolver_delay_ticks, 1);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.zones.len(), 1);
        assert_eq!(config.zones[0].enter_priority, RegionPriority::High);
        assert_eq!(config.zones[0].leave_priority, RegionPriority::Default);
        assert_eq!(config.zones[0].enter_message.as_deref(), Some("You entered the yard."));
        assert!(config.validate().is_ok());

        let manifest = config.manifest();
        assert_eq!(manifest.name, "Prison");
        assert_eq!(manifest.commands, vec!["jail".to_string(), "warp".to_string()]);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "[server\nname = ").await.unwrap();

        let result = AppConfig::load_from_file(file.path()).await;

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_invalid_tick_interval() {
        let mut config = AppConfig::default();
        config.server.tick_interval_ms = 0;
        assert!(config.validate().is_err());
        config.server.tick_interval_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));
    }

    #[test]
    fn test_validation_zones() {
        let mut config = AppConfig::default();
        config.zones = vec![zone("yard", "world"), zone("Yard", "world")];
        assert!(config.validate().unwrap_err().contains("defined twice"));

        config.zones = vec![zone("yard", "nether")];
        assert!(config.validate().unwrap_err().contains("unknown world"));

        config.zones = vec![zone("yard", "world")];
        config.zones[0].max[1] = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_framework_sections() {
        let mut config = AppConfig::default();
        config.commands.help_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.regions.watcher_interval_ticks = 0;
        assert!(config.validate().is_err());
    }
}
