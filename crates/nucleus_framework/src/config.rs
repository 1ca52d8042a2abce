//! Tunables for the framework services.
//!
//! Every struct deserializes with defaults for missing fields, so hosts can
//! embed them in their own config files and only override what they need.

use serde::{Deserialize, Serialize};

fn default_watcher_interval_ticks() -> u64 {
    3
}

fn default_resolver_delay_ticks() -> u64 {
    1
}

fn default_help_page_size() -> usize {
    6
}

fn default_warden_delay_ticks() -> u64 {
    20
}

fn default_warden_interval_ticks() -> u64 {
    1200
}

/// Region watcher timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Ticks between sampler cycles
    #[serde(default = "default_watcher_interval_ticks")]
    pub watcher_interval_ticks: u64,
    /// Ticks between a sampler cycle and its async resolver pass
    #[serde(default = "default_resolver_delay_ticks")]
    pub resolver_delay_ticks: u64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            watcher_interval_ticks: default_watcher_interval_ticks(),
            resolver_delay_ticks: default_resolver_delay_ticks(),
        }
    }
}

/// Command dispatcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Help entries per page
    #[serde(default = "default_help_page_size")]
    pub help_page_size: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            help_page_size: default_help_page_size(),
        }
    }
}

/// Jail warden timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JailConfig {
    /// Ticks before the first warden run
    #[serde(default = "default_warden_delay_ticks")]
    pub warden_delay_ticks: u64,
    /// Ticks between warden runs
    #[serde(default = "default_warden_interval_ticks")]
    pub warden_interval_ticks: u64,
}

impl Default for JailConfig {
    fn default() -> Self {
        Self {
            warden_delay_ticks: default_warden_delay_ticks(),
            warden_interval_ticks: default_warden_interval_ticks(),
        }
    }
}
