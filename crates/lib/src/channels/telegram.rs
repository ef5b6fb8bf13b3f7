//! Telegram channel: webhook update payloads and the Bot API calls the relay makes
//! (sendMessage, setWebhook, deleteWebhook).

use crate::channels::handle::{ChannelError, ChannelHandle};
use crate::channels::inbound::{ConversationId, InboundEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const CHANNEL_ID: &str = "telegram";

/// Telegram update payload (webhook POST body). Only the fields the relay reads are modeled.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub chat: Option<TelegramChat>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    #[serde(default)]
    pub id: Option<ConversationId>,
}

impl TelegramUpdate {
    /// Extract chat id and text. Missing `message` or `message.chat.id` is an error; missing text is empty.
    pub fn into_inbound(self) -> Result<InboundEvent, String> {
        let message = self.message.ok_or("missing field: message")?;
        let conversation_id = message
            .chat
            .and_then(|c| c.id)
            .ok_or("missing field: message.chat.id")?;
        if let ConversationId::Text(ref s) = conversation_id {
            if s.trim().is_empty() {
                return Err("empty message.chat.id".to_string());
            }
        }
        Ok(InboundEvent {
            conversation_id,
            text: message.text.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a ConversationId,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SetWebhookBody<'a> {
    url: &'a str,
}

/// Telegram channel connector: sends replies via sendMessage and manages the webhook registration.
pub struct TelegramChannel {
    token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Bot API method URL, e.g. https://api.telegram.org/bot<token>/sendMessage.
    fn method_url(&self, method: &str) -> Result<String, ChannelError> {
        let token = self.token.as_ref().ok_or(ChannelError::NotConfigured {
            channel: CHANNEL_ID,
        })?;
        Ok(format!("{}/bot{}/{}", self.api_base, token, method))
    }

    /// POST a Bot API method with an optional JSON body; non-2xx is an error.
    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: Option<&B>) -> Result<(), ChannelError> {
        let url = self.method_url(method)?;
        let mut req = self.client.post(&url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req.send().await.map_err(|e| ChannelError::Request {
            channel: CHANNEL_ID,
            // Drop the URL: it embeds the bot token.
            source: e.without_url(),
        })?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                channel: CHANNEL_ID,
                message: format!("{} failed: {} {}", method, status, body),
            });
        }
        Ok(())
    }

    /// Set webhook URL. Telegram then POSTs updates to the URL.
    pub async fn set_webhook(&self, url: &str) -> Result<(), ChannelError> {
        self.call("setWebhook", Some(&SetWebhookBody { url })).await
    }

    /// Remove the webhook registration.
    pub async fn delete_webhook(&self) -> Result<(), ChannelError> {
        self.call::<()>("deleteWebhook", None).await
    }
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        CHANNEL_ID
    }

    async fn send_message(&self, conversation_id: &ConversationId, text: &str) -> Result<(), ChannelError> {
        let body = SendMessageBody {
            chat_id: conversation_id,
            text,
        };
        self.call("sendMessage", Some(&body)).await
    }
}
