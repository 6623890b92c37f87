use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::NotificationMessage;
use crate::utils::error::Result;

/// The account the bot is connected as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discriminator.as_deref() {
            // Accounts migrated to unique usernames report "0".
            Some(tag) if !tag.is_empty() && tag != "0" => write!(f, "{}#{}", self.username, tag),
            _ => f.write_str(&self.username),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub channel_id: u64,
    pub message_id: String,
}

/// Trait for chat destinations the watcher posts to.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Resolves the connected account; succeeding is the readiness signal.
    async fn identity(&self) -> Result<BotIdentity>;

    /// One delivery attempt. No queueing, retry or rate limiting.
    async fn send(&self, message: &NotificationMessage) -> Result<DeliveryReceipt>;
}
