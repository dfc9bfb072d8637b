use crate::error::Result;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// One request to the chat-completions API: a fixed system instruction plus
/// the rendered user prompt.
#[derive(Debug, Clone)]
pub struct ChatPrompt<'a> {
    pub system: &'a str,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Seam between the graders/advisors and the external text-generation
/// service. Production uses [`AiService`]; tests substitute local stubs.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: ChatPrompt<'_>) -> Result<String>;
}

#[derive(Clone)]
pub struct AiService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl AiService {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }
}

impl TextGenerator for AiService {
    async fn generate(&self, prompt: ChatPrompt<'_>) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": prompt.temperature,
            "max_tokens": prompt.max_tokens
        });

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API Error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response format").into())
    }
}
