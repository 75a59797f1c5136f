use crate::errors::HawxError;
use super::catalog;
use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::openrouter::OpenRouterProvider;
use super::provider::LLMProvider;

/// Pick the backend for `provider_name` once, at startup.
///
/// Unknown provider names are accepted when an explicit `base_url` is given
/// and treated as OpenAI-compatible endpoints.
pub fn create_provider(
    provider_name: &str,
    api_key: &str,
    model: Option<&str>,
    base_url: Option<&str>,
) -> Result<Box<dyn LLMProvider>, HawxError> {
    let model = model.or_else(|| catalog::get_provider(provider_name).map(|p| p.default_model));

    match provider_name {
        "openai" | "groq" => {
            let url = base_url
                .or_else(|| catalog::get_provider(provider_name).map(|p| p.base_url))
                .unwrap_or("https://api.openai.com/v1");
            Ok(Box::new(OpenAIProvider::with_base_url(provider_name, api_key, model, url)))
        }
        "openrouter" => Ok(Box::new(OpenRouterProvider::new(api_key, model, base_url))),
        "ollama" => Ok(Box::new(OllamaProvider::new(base_url, model))),
        other => match base_url {
            Some(url) => Ok(Box::new(OpenAIProvider::with_base_url(other, api_key, model, url))),
            None => Err(HawxError::Config(format!(
                "Unknown LLM provider '{}' (expected groq, openai, openrouter or ollama, or set llm.base_url)",
                other
            ))),
        },
    }
}
