// Monitoring configuration

use crate::Result;
use crate::monitor::alerts::DispatchMode;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main monitoring configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Certificate check settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_alert_threshold_days")]
    pub alert_threshold_days: u32,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
    #[serde(default = "default_check_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            alert_threshold_days: default_alert_threshold_days(),
            interval_seconds: default_interval_seconds(),
            max_concurrent_checks: default_max_concurrent_checks(),
            timeout_seconds: default_check_timeout_seconds(),
        }
    }
}

/// Notification channels, dispatched in the order DingTalk then Email
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dingtalk: Option<DingTalkConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
}

/// DingTalk robot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DingTalkConfig {
    pub enabled: bool,
    pub webhook: String,
    #[serde(default)]
    pub at_mobiles: Vec<String>,
}

/// Email configuration. The relay is reached over implicit TLS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_smtp_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_alert_threshold_days() -> u32 {
    30
}

fn default_interval_seconds() -> u64 {
    86400
}

fn default_max_concurrent_checks() -> usize {
    10
}

fn default_check_timeout_seconds() -> u64 {
    10
}

fn default_smtp_port() -> u16 {
    465
}

fn default_from_name() -> String {
    "CertAlert".to_string()
}

fn default_smtp_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a YAML file, or TOML when the extension is `.toml`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config = match ConfigFormat::for_path(path) {
            ConfigFormat::Toml => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config {:?}", path))?,
            ConfigFormat::Yaml => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config {:?}", path))?,
        };

        Ok(config)
    }

    /// Save configuration in the format implied by the file extension
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let contents = match ConfigFormat::for_path(path) {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).context("Failed to serialize config as TOML")?
            }
            ConfigFormat::Yaml => {
                serde_yaml::to_string(self).context("Failed to serialize config as YAML")?
            }
        };

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {:?}", path))?;

        Ok(())
    }

    /// Get list of enabled alert channels, in dispatch order
    pub fn enabled_channels(&self) -> Vec<String> {
        let mut channels = Vec::new();

        if let Some(ref dingtalk) = self.notify.dingtalk
            && dingtalk.enabled
        {
            channels.push("dingtalk".to_string());
        }

        if let Some(ref email) = self.notify.email
            && email.enabled
        {
            channels.push("email".to_string());
        }

        channels
    }
}
