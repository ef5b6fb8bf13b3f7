//! Relay turn: parse the inbound update, ask the completion provider for a reply,
//! send the reply back to the same conversation.

use crate::channels::{ChannelHandle, InboundEvent, TelegramUpdate};
use crate::error::RelayError;
use crate::llm::{ChatMessage, CompletionProvider, CompletionRequest};
use std::sync::Arc;

/// System instruction placed before every user message ("You are a friendly, logical AI assistant.").
pub const SYSTEM_PROMPT: &str = "你是一个友好、有逻辑的AI助手。";

/// Sampling temperature for every completion.
pub const TEMPERATURE: f64 = 0.6;

/// Parse a raw webhook body into an inbound event.
pub fn parse_inbound(raw: &[u8]) -> Result<InboundEvent, RelayError> {
    let update: TelegramUpdate =
        serde_json::from_slice(raw).map_err(|e| RelayError::Malformed(e.to_string()))?;
    update.into_inbound().map_err(RelayError::Malformed)
}

/// Prompt for one user message: the persona, then the message.
pub fn build_completion_request(user_text: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_text)],
        temperature: TEMPERATURE,
    }
}

/// The completion provider and the channel replies go out on. Cheap to clone.
#[derive(Clone)]
pub struct Relay {
    provider: Arc<dyn CompletionProvider>,
    channel: Arc<dyn ChannelHandle>,
}

impl Relay {
    pub fn new(provider: Arc<dyn CompletionProvider>, channel: Arc<dyn ChannelHandle>) -> Self {
        Self { provider, channel }
    }

    /// Handle one webhook body end to end. The send only starts after the completion returns.
    pub async fn handle_inbound(&self, raw: &[u8]) -> Result<(), RelayError> {
        let event = parse_inbound(raw)?;
        log::debug!(
            "relay: {} message from {} ({} chars)",
            self.channel.id(),
            event.conversation_id,
            event.text.chars().count()
        );
        let reply = self.generate_reply(&event.text).await?;
        self.channel
            .send_message(&event.conversation_id, &reply)
            .await?;
        log::debug!("relay: reply sent to {}", event.conversation_id);
        Ok(())
    }

    /// First choice of the completion, trimmed.
    pub async fn generate_reply(&self, user_text: &str) -> Result<String, RelayError> {
        let request = build_completion_request(user_text);
        let response = self.provider.complete(&request).await?;
        Ok(response.first_choice()?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelError, ConversationId};
    use crate::llm::{CompletionResponse, LlmError, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Reply {
        Choices(Vec<&'static str>),
        Fail,
    }

    struct MockProvider {
        reply: Reply,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl MockProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for MockProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Choices(c) => Ok(CompletionResponse {
                    choices: c.iter().map(|s| s.to_string()).collect(),
                }),
                Reply::Fail => Err(LlmError::Api("503 Service Unavailable".to_string())),
            }
        }
    }

    struct MockChannel {
        fail: bool,
        sent: Mutex<Vec<(ConversationId, String)>>,
    }

    impl MockChannel {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChannelHandle for MockChannel {
        fn id(&self) -> &str {
            "mock"
        }

        async fn send_message(&self, conversation_id: &ConversationId, text: &str) -> Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push((conversation_id.clone(), text.to_string()));
            if self.fail {
                return Err(ChannelError::Api {
                    channel: "mock",
                    message: "sendMessage failed: 400 Bad Request".to_string(),
                });
            }
            Ok(())
        }
    }

    fn relay(provider: &Arc<MockProvider>, channel: &Arc<MockChannel>) -> Relay {
        Relay::new(provider.clone(), channel.clone())
    }

    #[tokio::test]
    async fn relays_reply_to_same_chat() {
        let provider = MockProvider::new(Reply::Choices(vec!["Hello!"]));
        let channel = MockChannel::new(false);
        relay(&provider, &channel)
            .handle_inbound(br#"{"message":{"chat":{"id":42},"text":"hi"}}"#)
            .await
            .unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, 0.6);
        assert_eq!(
            calls[0].messages,
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user("hi")]
        );
        assert_eq!(calls[0].messages[0].role, Role::System);

        let sent = channel.sent.lock().unwrap();
        assert_eq!(*sent, vec![(ConversationId::Int(42), "Hello!".to_string())]);
    }

    #[test]
    fn persona_is_fixed_system_entry() {
        let req = build_completion_request("hi");
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[0].content, "你是一个友好、有逻辑的AI助手。");
        assert_eq!(req.messages[1], ChatMessage::user("hi"));
        assert_eq!(req.temperature, TEMPERATURE);
    }

    #[tokio::test]
    async fn reply_is_trimmed_first_choice() {
        let provider = MockProvider::new(Reply::Choices(vec!["  Hello there!  \n", "other"]));
        let channel = MockChannel::new(false);
        relay(&provider, &channel)
            .handle_inbound(br#"{"message":{"chat":{"id":7},"text":"yo"}}"#)
            .await
            .unwrap();
        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].1, "Hello there!");
    }

    #[tokio::test]
    async fn missing_text_sends_empty_user_message() {
        let provider = MockProvider::new(Reply::Choices(vec!["ok"]));
        let channel = MockChannel::new(false);
        relay(&provider, &channel)
            .handle_inbound(br#"{"message":{"chat":{"id":7}}}"#)
            .await
            .unwrap();
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].messages[1], ChatMessage::user(""));
    }

    #[tokio::test]
    async fn malformed_payload_makes_no_downstream_calls() {
        for body in [
            &br#"{"update_id":1}"#[..],
            &br#"{"message":{"text":"hi"}}"#[..],
            &b"not json"[..],
        ] {
            let provider = MockProvider::new(Reply::Choices(vec!["x"]));
            let channel = MockChannel::new(false);
            let err = relay(&provider, &channel).handle_inbound(body).await.unwrap_err();
            assert!(matches!(err, RelayError::Malformed(_)));
            assert!(provider.calls.lock().unwrap().is_empty());
            assert!(channel.sent.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn provider_failure_sends_nothing() {
        let provider = MockProvider::new(Reply::Fail);
        let channel = MockChannel::new(false);
        let err = relay(&provider, &channel)
            .handle_inbound(br#"{"message":{"chat":{"id":42},"text":"hi"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Completion(LlmError::Api(_))));
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_choices_is_completion_error() {
        let provider = MockProvider::new(Reply::Choices(vec![]));
        let channel = MockChannel::new(false);
        let err = relay(&provider, &channel)
            .handle_inbound(br#"{"message":{"chat":{"id":42},"text":"hi"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Completion(LlmError::EmptyChoices)));
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_once() {
        let provider = MockProvider::new(Reply::Choices(vec!["Hello!"]));
        let channel = MockChannel::new(true);
        let err = relay(&provider, &channel)
            .handle_inbound(br#"{"message":{"chat":{"id":42},"text":"hi"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Delivery(_)));
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }
}
