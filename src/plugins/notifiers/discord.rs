use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::{debug, info};

use crate::config::DiscordConfig;
use crate::models::{Attachment, NotificationMessage};
use crate::plugins::traits::{BotIdentity, DeliveryReceipt, Notifier};
use crate::utils::error::{AppError, Result};

const USER_AGENT: &str = "DiscordBot (https://github.com/diamond-sale-watcher, 0.1)";

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Posts to channels through the Discord REST API using a bot token.
pub struct DiscordNotifier {
    client: Client,
    api_base: Url,
    token: String,
}

impl fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base).map_err(|e| AppError::InvalidUrl {
            url: config.api_base.clone(),
            message: e.to_string(),
        })?;
        Self::with_base_url(config.token.clone(), api_base)
    }

    pub fn with_base_url(token: String, api_base: Url) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_base,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base.join(path).map_err(|e| AppError::InvalidUrl {
            url: format!("{}{}", self.api_base, path),
            message: e.to_string(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    fn create_payload(&self, message: &NotificationMessage) -> serde_json::Value {
        let mut payload = json!({ "content": message.content });

        if let Some(attachment) = &message.attachment {
            payload["attachments"] = json!([{ "id": 0, "filename": attachment.filename }]);
        }

        payload
    }

    fn create_form(&self, message: &NotificationMessage, attachment: &Attachment) -> Result<Form> {
        let file = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.filename.clone())
            .mime_str(mime_for(&attachment.filename))?;

        Ok(Form::new()
            .text("payload_json", self.create_payload(message).to_string())
            .part("files[0]", file))
    }

    async fn rejection(channel_id: u64, response: Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        let message = match status {
            StatusCode::NOT_FOUND => format!("channel not found: {}", detail),
            _ => format!("rejected with status {}: {}", status, detail),
        };
        AppError::Delivery { channel_id, message }
    }
}

fn mime_for(filename: &str) -> &'static str {
    let extension = filename.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn identity(&self) -> Result<BotIdentity> {
        let identity = self
            .client
            .get(self.endpoint("users/@me")?)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await?
            .error_for_status()?
            .json::<BotIdentity>()
            .await?;

        debug!(user = %identity, "Resolved bot identity");
        Ok(identity)
    }

    async fn send(&self, message: &NotificationMessage) -> Result<DeliveryReceipt> {
        let channel_id = message.channel_id;
        let url = self.endpoint(&format!("channels/{}/messages", channel_id))?;

        let request = self.client.post(url).header(AUTHORIZATION, self.auth_header());
        let request = match &message.attachment {
            Some(attachment) => request.multipart(self.create_form(message, attachment)?),
            None => request.json(&self.create_payload(message)),
        };

        let response = request.send().await.map_err(|e| AppError::Delivery {
            channel_id,
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(Self::rejection(channel_id, response).await);
        }

        let created: CreatedMessage = response.json().await.map_err(|e| AppError::Delivery {
            channel_id,
            message: format!("unreadable response: {}", e),
        })?;

        info!(channel_id, message_id = %created.id, "Message delivered");
        Ok(DeliveryReceipt {
            channel_id,
            message_id: created.id,
        })
    }
}
