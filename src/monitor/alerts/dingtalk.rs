// DingTalk Alert Channel - Text message robot webhook

use crate::error::ChannelError;
use crate::monitor::alerts::{AlertChannel, AlertMessage};
use crate::monitor::config::DingTalkConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// DingTalk robot alert channel
pub struct DingTalkChannel {
    config: DingTalkConfig,
    client: reqwest::Client,
}

impl DingTalkChannel {
    /// Create new DingTalk channel
    pub fn new(config: DingTalkConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Format alert as a DingTalk text message
    fn format_payload(&self, message: &AlertMessage) -> serde_json::Value {
        json!({
            "msgtype": "text",
            "text": {
                "content": message.display_text()
            },
            "at": {
                "atMobiles": self.config.at_mobiles,
                "isAtAll": false
            }
        })
    }
}

#[async_trait]
impl AlertChannel for DingTalkChannel {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn channel_name(&self) -> &str {
        "DingTalk"
    }

    async fn send_alert(&self, message: &AlertMessage) -> Result<(), ChannelError> {
        if !self.config.enabled {
            return Ok(());
        }

        let payload = self.format_payload(message);

        let response = self
            .client
            .post(&self.config.webhook)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::http(format!("send dingtalk message: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
