//! OpenAI-compatible chat completion client: POST {base_url}/chat/completions with bearer auth.

use crate::llm::{ChatMessage, CompletionProvider, CompletionRequest, CompletionResponse, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Model id sent with every completion request.
pub const COMPLETION_MODEL: &str = "mimo-v2-flash";

/// Client for an OpenAI-compatible completion endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: COMPLETION_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /chat/completions — non-streaming chat.
    async fn chat_completions(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = OpenAiChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: OpenAiChatResponse = res.json().await?;
        openai_response_to_completion(data)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        log::debug!(
            "completion: {} message(s) to {} ({})",
            request.messages.len(),
            self.base_url,
            self.model
        );
        self.chat_completions(request).await
    }
}

// --- OpenAI wire types ---

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Option<Vec<OpenAiChoice>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// Collect choice texts. A choice without message content is an API error, since the
/// relay has nothing to send for it.
fn openai_response_to_completion(data: OpenAiChatResponse) -> Result<CompletionResponse, LlmError> {
    let choices = data
        .choices
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            c.message
                .and_then(|m| m.content)
                .ok_or_else(|| LlmError::Api(format!("choice {} has no message content", i)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if choices.is_empty() {
        return Err(LlmError::EmptyChoices);
    }
    Ok(CompletionResponse { choices })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<CompletionResponse, LlmError> {
        openai_response_to_completion(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn request_body_shape() {
        let messages = vec![ChatMessage::system("be nice"), ChatMessage::user("hi")];
        let body = OpenAiChatRequest {
            model: COMPLETION_MODEL,
            messages: &messages,
            temperature: 0.6,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "model": "mimo-v2-flash",
                "messages": [
                    { "role": "system", "content": "be nice" },
                    { "role": "user", "content": "hi" }
                ],
                "temperature": 0.6
            })
        );
    }

    #[test]
    fn parses_choices_in_order() {
        let res = parse(
            r#"{"id":"x","choices":[
                {"index":0,"message":{"role":"assistant","content":"  Hello there!  \n"}},
                {"index":1,"message":{"role":"assistant","content":"second"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(res.choices, vec!["  Hello there!  \n", "second"]);
    }

    #[test]
    fn empty_or_missing_choices_is_error() {
        assert!(matches!(parse(r#"{"choices":[]}"#), Err(LlmError::EmptyChoices)));
        assert!(matches!(parse(r#"{}"#), Err(LlmError::EmptyChoices)));
    }

    #[test]
    fn choice_without_content_is_error() {
        let err = parse(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
            .unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OpenAiClient::new("http://localhost:1234/v1/", None);
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
    }
}
