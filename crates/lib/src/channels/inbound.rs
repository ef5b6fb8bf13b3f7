//! Inbound event from a channel: the conversation to answer and the text to answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque chat identifier, passed through to the outbound send unmodified.
/// Telegram uses integers; string ids (e.g. "@channel") are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConversationId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationId::Int(id) => write!(f, "{}", id),
            ConversationId::Text(id) => f.write_str(id),
        }
    }
}

/// One message delivered by the messaging platform.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub conversation_id: ConversationId,
    /// Message text; empty when the message carried none.
    pub text: String,
}
