use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use crate::errors::HawxError;
use super::provider::LLMProvider;
use super::types::{chat_messages, LLMResponse};

/// Chat-completions backend shared by OpenAI, Groq and custom endpoints.
pub struct OpenAIProvider {
    client: Client,
    provider: String,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: Option<&str>) -> Self {
        Self::with_base_url("openai", api_key, model, "https://api.openai.com/v1")
    }

    pub fn with_base_url(provider: &str, api_key: &str, model: Option<&str>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            provider: provider.to_string(),
            api_key: api_key.to_string(),
            model: model.unwrap_or("gpt-4o-mini").to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Map an HTTP response from a chat-completions endpoint to an `LLMResponse`.
pub(crate) async fn parse_chat_response(
    resp: Response,
    label: &str,
    model: &str,
) -> Result<LLMResponse, HawxError> {
    let status = resp.status();
    match status.as_u16() {
        429 => return Err(HawxError::RateLimit(format!("{} rate limit", label))),
        401 | 403 => return Err(HawxError::Authentication(format!("{} rejected the API key", label))),
        _ => {}
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(HawxError::LLMApi(format!(
            "{} returned {}: {}",
            label,
            status,
            body.chars().take(300).collect::<String>()
        )));
    }

    let data: Value = resp.json().await
        .map_err(|e| HawxError::LLMApi(format!("Failed to parse {} response: {}", label, e)))?;

    if let Some(error) = data.get("error") {
        return Err(HawxError::LLMApi(error["message"].as_str().unwrap_or("Unknown").to_string()));
    }

    let content = data["choices"][0]["message"]["content"].as_str()
        .ok_or_else(|| HawxError::LLMApi(format!("No content in {} response", label)))?
        .to_string();

    Ok(LLMResponse {
        content,
        input_tokens: data["usage"]["prompt_tokens"].as_u64(),
        output_tokens: data["usage"]["completion_tokens"].as_u64(),
        model: model.to_string(),
    })
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<LLMResponse, HawxError> {
        let body = json!({
            "model": self.model,
            "messages": chat_messages(prompt, system),
        });

        let resp = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| HawxError::Network(format!("{} request failed: {}", self.provider, e)))?;

        parse_chat_response(resp, &self.provider, &self.model).await
    }

    fn provider_name(&self) -> &str { &self.provider }
    fn model_name(&self) -> &str { &self.model }
}
