use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{with_retry, HawxError, RetryConfig};
use crate::llm::LLMProvider;
use crate::prompts::{bullet_list, render, PromptName, PromptVariables};
use super::capabilities::{DedupOracle, Repairer, SummaryRequest, Summarizer};

const SYSTEM_PROMPT: &str =
    "You are an assistant for authorized penetration testing reconnaissance. Follow the output format exactly.";

/// Language-model backed implementation of the analysis capabilities.
pub struct LlmAnalyst {
    provider: Arc<dyn LLMProvider>,
    retry: RetryConfig,
    available_tools: Vec<String>,
    wordlists: Vec<String>,
    dedup_cap: usize,
}

impl LlmAnalyst {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            retry: RetryConfig::default(),
            available_tools: Vec::new(),
            wordlists: Vec::new(),
            dedup_cap: crate::config::DEFAULT_DEDUP_CAP,
        }
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.available_tools = tools;
        self
    }

    pub fn with_wordlists(mut self, wordlists: Vec<String>) -> Self {
        self.wordlists = wordlists;
        self
    }

    pub fn with_dedup_cap(mut self, cap: usize) -> Self {
        self.dedup_cap = cap;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn ask(&self, operation: &str, prompt: String) -> Result<String, HawxError> {
        let provider = self.provider.clone();
        let response = with_retry(operation, &self.retry, || {
            let provider = provider.clone();
            let prompt = prompt.clone();
            async move { provider.complete(&prompt, Some(SYSTEM_PROMPT)).await }
        })
        .await?;

        debug!(
            operation,
            provider = self.provider.provider_name(),
            model = %response.model,
            input_tokens = ?response.input_tokens,
            output_tokens = ?response.output_tokens,
            "LLM call complete"
        );
        Ok(response.content)
    }
}

#[async_trait]
impl Summarizer for LlmAnalyst {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, HawxError> {
        let vars = PromptVariables {
            command: Some(request.command.to_string()),
            output: Some(request.output.to_string()),
            previous_summary: request.previous_summary.map(str::to_string),
            similar_context: request.similar_context.map(str::to_string),
            previous_commands: Some(bullet_list(request.previous_commands)),
            available_tools: Some(self.available_tools.join(", ")),
            wordlists: Some(bullet_list(&self.wordlists)),
            ..Default::default()
        };
        self.ask("summarize", render(PromptName::Summarize, &vars)).await
    }

    async fn executive_summary(
        &self,
        target: &str,
        material: &str,
        previous: Option<&str>,
    ) -> Result<String, HawxError> {
        let vars = PromptVariables {
            target: Some(target.to_string()),
            material: Some(material.to_string()),
            previous_summary: previous.map(str::to_string),
            ..Default::default()
        };
        self.ask("executive_summary", render(PromptName::ExecutiveSummary, &vars)).await
    }
}

#[async_trait]
impl DedupOracle for LlmAnalyst {
    async fn deduplicate(&self, current: &[String], prior: &[String]) -> Result<String, HawxError> {
        let vars = PromptVariables {
            current_layer: Some(bullet_list(current)),
            prior_layers: Some(bullet_list(prior)),
            cap: Some(self.dedup_cap.to_string()),
            ..Default::default()
        };
        self.ask("deduplicate", render(PromptName::Deduplicate, &vars)).await
    }
}

#[async_trait]
impl Repairer for LlmAnalyst {
    async fn repair(&self, malformed: &str) -> Result<String, HawxError> {
        let vars = PromptVariables {
            malformed: Some(malformed.to_string()),
            ..Default::default()
        };
        self.ask("repair", render(PromptName::Repair, &vars)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use std::sync::Mutex;

    /// Records prompts and echoes a canned answer.
    struct EchoProvider {
        answer: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(&self, prompt: &str, _system: Option<&str>) -> Result<LLMResponse, HawxError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(LLMResponse {
                content: self.answer.clone(),
                input_tokens: None,
                output_tokens: None,
                model: "echo".into(),
            })
        }
        fn provider_name(&self) -> &str { "echo" }
        fn model_name(&self) -> &str { "echo" }
    }

    fn analyst(answer: &str) -> (Arc<EchoProvider>, LlmAnalyst) {
        let provider = Arc::new(EchoProvider { answer: answer.into(), prompts: Mutex::new(Vec::new()) });
        let analyst = LlmAnalyst::new(provider.clone())
            .with_tools(vec!["nmap".into(), "ffuf".into()])
            .with_retry_config(RetryConfig::none());
        (provider, analyst)
    }

    #[tokio::test]
    async fn test_summarize_prompt_carries_context() {
        let (provider, analyst) = analyst("{}");
        let previous = vec!["nmap -sC -sV -p- 10.0.0.1".to_string()];
        let out = analyst.summarize(SummaryRequest {
            command: "whatweb http://10.0.0.1",
            output: "Apache[2.4.41]",
            previous_commands: &previous,
            similar_context: None,
            previous_summary: None,
        }).await.unwrap();

        assert_eq!(out, "{}");
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("Apache[2.4.41]"));
        assert!(prompts[0].contains("- nmap -sC -sV -p- 10.0.0.1"));
        assert!(prompts[0].contains("nmap, ffuf"));
    }

    #[tokio::test]
    async fn test_dedup_prompt_lists_both_sides() {
        let (provider, analyst) = analyst(r#"{"deduplicated_commands":[]}"#);
        analyst.deduplicate(&["curl http://x/robots.txt".into()], &["nmap x".into()]).await.unwrap();
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("- curl http://x/robots.txt"));
        assert!(prompts[0].contains("- nmap x"));
    }

    #[tokio::test]
    async fn test_repair_embeds_malformed_text() {
        let (provider, analyst) = analyst("{}");
        analyst.repair("{broken").await.unwrap();
        assert!(provider.prompts.lock().unwrap()[0].contains("{broken"));
    }
}
