use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use crate::errors::HawxError;
use super::provider::LLMProvider;
use super::types::LLMResponse;

pub struct OllamaProvider {
    client: Client,
    host: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(host: Option<&str>, model: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            host: host.unwrap_or("http://localhost:11434").trim_end_matches('/').to_string(),
            model: model.unwrap_or("llama3").to_string(),
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<LLMResponse, HawxError> {
        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(sys) = system {
            body["system"] = json!(sys);
        }

        let resp = self.client
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| HawxError::Network(format!("Ollama request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HawxError::LLMApi(format!("Ollama returned {}", status)));
        }

        let data: Value = resp.json().await
            .map_err(|e| HawxError::LLMApi(format!("Parse error: {}", e)))?;

        let content = data["response"].as_str().unwrap_or("").trim().to_string();

        Ok(LLMResponse {
            content,
            input_tokens: data["prompt_eval_count"].as_u64(),
            output_tokens: data["eval_count"].as_u64(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &str { "ollama" }
    fn model_name(&self) -> &str { &self.model }
}
