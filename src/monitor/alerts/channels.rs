// Alert Channel Trait

use crate::error::ChannelError;
use crate::monitor::alerts::AlertMessage;
use async_trait::async_trait;

/// Alert channel trait - implement this to add a new notification transport
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Whether the channel is switched on in its configuration
    fn is_enabled(&self) -> bool;

    /// Get the channel name for logging and error reports
    fn channel_name(&self) -> &str;

    /// Send an alert through this channel.
    ///
    /// A disabled channel must return `Ok(())` without touching its transport,
    /// even when called directly.
    async fn send_alert(&self, message: &AlertMessage) -> Result<(), ChannelError>;
}
