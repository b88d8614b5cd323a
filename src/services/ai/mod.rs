pub mod groq;
pub mod intent;
pub mod ollama;
pub mod prompt;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::ChatMessage;

/// How many trailing turns of history are forwarded to the model.
pub const MAX_HISTORY_TURNS: usize = 12;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, system_prompt: &str, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

/// OpenAI-style message array: system prompt first, then the tail of the history.
pub(crate) fn chat_payload_messages(system_prompt: &str, messages: &[ChatMessage]) -> Vec<Value> {
    let skip = messages.len().saturating_sub(MAX_HISTORY_TURNS);
    std::iter::once(json!({ "role": "system", "content": system_prompt }))
        .chain(messages.iter().skip(skip).map(|m| {
            json!({
                "role": m.role,
                "content": m.content,
            })
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_keeps_system_and_recent_tail() {
        let history: Vec<ChatMessage> = (0..20)
            .map(|i| ChatMessage {
                role: "user".to_string(),
                content: format!("msg {i}"),
            })
            .collect();

        let payload = chat_payload_messages("sys", &history);
        assert_eq!(payload.len(), MAX_HISTORY_TURNS + 1);
        assert_eq!(payload[0]["role"], "system");
        assert_eq!(payload[1]["content"], "msg 8");
        assert_eq!(payload[MAX_HISTORY_TURNS]["content"], "msg 19");
    }
}
