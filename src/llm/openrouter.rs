use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use crate::errors::HawxError;
use super::openai::parse_chat_response;
use super::provider::LLMProvider;
use super::types::{chat_messages, LLMResponse};

const REFERER: &str = "https://hawx.local";
const TITLE: &str = "Hawx Recon Agent";

pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: &str, model: Option<&str>, base_url: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.unwrap_or("meta-llama/llama-3.3-70b-instruct").to_string(),
            base_url: base_url
                .unwrap_or("https://openrouter.ai/api/v1")
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<LLMResponse, HawxError> {
        let body = json!({
            "model": self.model,
            "messages": chat_messages(prompt, system),
        });

        // OpenRouter attributes traffic through these two headers.
        let resp = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| HawxError::Network(format!("OpenRouter request failed: {}", e)))?;

        parse_chat_response(resp, "OpenRouter", &self.model).await
    }

    fn provider_name(&self) -> &str { "openrouter" }
    fn model_name(&self) -> &str { &self.model }
}
