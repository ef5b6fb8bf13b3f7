//! Outbound side of a channel: deliver reply text to a conversation.

use crate::channels::ConversationId;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("{channel} bot token not configured")]
    NotConfigured { channel: &'static str },
    #[error("{channel} request failed: {source}")]
    Request {
        channel: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{channel} api error: {message}")]
    Api {
        channel: &'static str,
        message: String,
    },
}

/// Handle to a messaging channel the relay can reply through.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;
    /// Send a text message to a conversation (e.g. Telegram chat_id).
    async fn send_message(&self, conversation_id: &ConversationId, text: &str) -> Result<(), ChannelError>;
}
