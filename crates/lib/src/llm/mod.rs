//! Completion provider abstraction and the OpenAI-compatible client.
//!
//! The relay only needs one non-streaming chat completion per inbound message, so the
//! provider trait is a single `complete` call.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat role of one prompt entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged prompt entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Prompt sent to the provider: ordered messages plus sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// Candidate texts returned by the provider, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub choices: Vec<String>,
}

impl CompletionResponse {
    /// Text of the first choice; an empty choice list is an error.
    pub fn first_choice(&self) -> Result<&str, LlmError> {
        self.choices
            .first()
            .map(String::as_str)
            .ok_or(LlmError::EmptyChoices)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
    #[error("completion returned no choices")]
    EmptyChoices,
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
