// Alert System - Sequential multi-channel alerting

pub mod channels;
pub mod dingtalk;
pub mod email;

use crate::certificates::CertificateVerdict;
use crate::error::{ChannelError, ChannelSendError, DispatchError};
use crate::monitor::config::{MonitorConfig, NotifyConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use channels::AlertChannel;
pub use dingtalk::DingTalkChannel;
pub use email::EmailChannel;

/// Format used for `expiry_date_text` when built from a verdict
pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Alert message handed to every channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub domain: String,
    pub expiry_date_text: String,
    pub days_left: i64,
}

impl AlertMessage {
    pub fn new(domain: impl Into<String>, expiry_date_text: impl Into<String>, days_left: i64) -> Self {
        Self {
            domain: domain.into(),
            expiry_date_text: expiry_date_text.into(),
            days_left,
        }
    }

    /// Create alert message from an inspection verdict
    pub fn from_verdict(verdict: &CertificateVerdict) -> Self {
        Self::new(
            verdict.domain.clone(),
            format_expiry(verdict.expiry_timestamp),
            verdict.days_remaining,
        )
    }

    /// Human readable sentence shared by all channels
    pub fn display_text(&self) -> String {
        if self.days_left < 0 {
            format!(
                "Certificate for {} already expired (expiry: {})",
                self.domain, self.expiry_date_text
            )
        } else {
            format!(
                "{} certificate expires in {} days (expiry: {})",
                self.domain, self.days_left, self.expiry_date_text
            )
        }
    }
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

pub fn format_expiry(expiry: DateTime<Utc>) -> String {
    expiry.format(EXPIRY_DATE_FORMAT).to_string()
}

/// How the dispatcher reacts to a failing channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Stop at the first failing channel and return its error
    #[default]
    ShortCircuit,
    /// Try every enabled channel and return all failures together
    BestEffort,
}

/// Alert dispatcher - sends one message to each channel in configured order
pub struct AlertDispatcher {
    channels: Vec<Box<dyn AlertChannel>>,
    mode: DispatchMode,
}

impl AlertDispatcher {
    /// Create new dispatcher
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            channels: Vec::new(),
            mode,
        }
    }

    /// Create from configuration. Channel order is DingTalk, then Email.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ChannelError> {
        Self::from_notify_config(&config.notify)
    }

    pub fn from_notify_config(notify: &NotifyConfig) -> Result<Self, ChannelError> {
        let mut dispatcher = Self::new(notify.mode);

        if let Some(ref dingtalk_config) = notify.dingtalk {
            dispatcher.add_channel(Box::new(DingTalkChannel::new(dingtalk_config.clone())?));
        }

        if let Some(ref email_config) = notify.email {
            dispatcher.add_channel(Box::new(EmailChannel::new(email_config.clone())?));
        }

        Ok(dispatcher)
    }

    /// Add an alert channel at the end of the sequence
    pub fn add_channel(&mut self, channel: Box<dyn AlertChannel>) {
        self.channels.push(channel);
    }

    pub fn with_channel(mut self, channel: Box<dyn AlertChannel>) -> Self {
        self.add_channel(channel);
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Get channel count
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Names of the channels that will actually send
    pub fn enabled_channel_names(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.channel_name())
            .collect()
    }

    /// Send alert through the channels one after another
    pub async fn send(&self, message: &AlertMessage) -> Result<(), DispatchError> {
        let mut failures = Vec::new();

        for channel in &self.channels {
            let name = channel.channel_name();

            if !channel.is_enabled() {
                tracing::info!("{} is disabled, skipping notification", name);
                continue;
            }

            tracing::debug!("{} sending notification: {}", name, message);

            match channel.send_alert(message).await {
                Ok(()) => tracing::info!("Alert sent via {}: {}", name, message.domain),
                Err(source) => {
                    let err = ChannelSendError {
                        channel: name.to_string(),
                        source,
                    };
                    match self.mode {
                        DispatchMode::ShortCircuit => return Err(DispatchError::Channel(err)),
                        DispatchMode::BestEffort => failures.push(err),
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Channels(failures))
        }
    }

    /// Send a sample message through every enabled channel, regardless of mode
    pub async fn test_channels(&self) -> Vec<(String, Result<(), ChannelError>)> {
        let sample = AlertMessage::new(
            "test.example.com",
            format_expiry(Utc::now()),
            7,
        );

        let mut results = Vec::new();

        for channel in self.channels.iter().filter(|c| c.is_enabled()) {
            let result = channel.send_alert(&sample).await;
            results.push((channel.channel_name().to_string(), result));
        }

        results
    }
}
