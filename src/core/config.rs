use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::monitor::{MonitorConfig, PressureThresholds, DEFAULT_MAX_READINGS};

pub const DEFAULT_WEBHOOK_HOST: &str = "webhook.site";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Empty disables beacons
    pub webhook_token: String,
    /// Host the token is posted to, `https://<host>/<token>`
    pub webhook_host: String,
    pub sample_interval_ms: u64,
    pub beacon_interval_ms: u64,
    pub max_readings: usize,
    pub critical_low_mb: f64,
    pub critical_drop_mb: f64,
    /// How often the host event poller checks thermal and memory state
    pub host_poll_interval_ms: u64,
    /// Available memory below which the poller raises a memory warning
    pub memory_warning_mb: f64,
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = PressureThresholds::default();
        Self {
            webhook_token: String::new(),
            webhook_host: DEFAULT_WEBHOOK_HOST.to_string(),
            sample_interval_ms: 2_000,
            beacon_interval_ms: 30_000,
            max_readings: DEFAULT_MAX_READINGS,
            critical_low_mb: thresholds.critical_low_mb,
            critical_drop_mb: thresholds.critical_drop_mb,
            host_poll_interval_ms: 5_000,
            memory_warning_mb: 300.0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Read config from `path`. A missing, empty or unreadable file yields
    /// the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, data).with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("tcc-monitor").join("config.json"))
    }

    pub fn set_webhook_token(&mut self, token: String) {
        self.webhook_token = token.trim().to_string();
    }

    pub fn set_webhook_host(&mut self, host: String) {
        self.webhook_host = host.trim().trim_end_matches('/').to_string();
    }

    /// Base URL beacons are posted under. A host given with a scheme is used
    /// as-is, otherwise https is assumed.
    pub fn endpoint_base(&self) -> String {
        if self.webhook_host.contains("://") {
            self.webhook_host.clone()
        } else {
            format!("https://{}", self.webhook_host)
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            beacon_interval: Duration::from_millis(self.beacon_interval_ms),
            max_readings: self.max_readings,
            thresholds: PressureThresholds {
                critical_low_mb: self.critical_low_mb,
                critical_drop_mb: self.critical_drop_mb,
            },
            endpoint_base: self.endpoint_base(),
            webhook_token: self.webhook_token.clone(),
        }
    }

    /// Token with everything but the last four characters masked
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.webhook_token.chars().collect();
        if chars.is_empty() {
            return "(not set)".to_string();
        }
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }
}
