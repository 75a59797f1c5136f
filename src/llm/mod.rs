pub mod provider;
pub mod openai;
pub mod openrouter;
pub mod ollama;
pub mod router;
pub mod types;
pub mod catalog;

pub use provider::LLMProvider;
pub use router::create_provider;
pub use types::LLMResponse;
