pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub requires_key: bool,
}

pub static PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        id: "groq",
        name: "Groq",
        base_url: "https://api.groq.com/openai/v1",
        default_model: "llama-3.3-70b-versatile",
        requires_key: true,
    },
    ProviderInfo {
        id: "openai",
        name: "OpenAI",
        base_url: "https://api.openai.com/v1",
        default_model: "gpt-4o-mini",
        requires_key: true,
    },
    ProviderInfo {
        id: "openrouter",
        name: "OpenRouter",
        base_url: "https://openrouter.ai/api/v1",
        default_model: "meta-llama/llama-3.3-70b-instruct",
        requires_key: true,
    },
    ProviderInfo {
        id: "ollama",
        name: "Ollama",
        base_url: "http://localhost:11434",
        default_model: "llama3",
        requires_key: false,
    },
];

pub fn get_provider(id: &str) -> Option<&'static ProviderInfo> {
    PROVIDERS.iter().find(|p| p.id == id)
}

pub fn get_default_model(provider_id: &str) -> &'static str {
    get_provider(provider_id)
        .map(|p| p.default_model)
        .unwrap_or("llama-3.3-70b-versatile")
}

/// Providers that need an API key before the workflow may start.
pub fn requires_api_key(provider_id: &str) -> bool {
    get_provider(provider_id).map_or(true, |p| p.requires_key)
}
