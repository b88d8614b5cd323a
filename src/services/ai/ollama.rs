use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{chat_payload_messages, LlmProvider};
use crate::models::ChatMessage;

pub struct OllamaProvider {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn chat(&self, system_prompt: &str, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": chat_payload_messages(system_prompt, messages),
            "stream": false,
            "options": { "temperature": 0.4 },
        });

        let resp = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .context("failed to reach Ollama")?
            .error_for_status()
            .context("Ollama returned an error status")?;

        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to decode Ollama reply")?;

        data["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("Ollama reply has no message content"))
    }
}
