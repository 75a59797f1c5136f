use tracing::debug;

use crate::errors::HawxError;
use crate::llm::catalog;
use super::types::HawxConfig;

pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, using literal");
                value.to_string()
            }
        }
    } else {
        value.to_string()
    }
}

/// Find the provider API key: `LLM_API_KEY` first, then `llm.api_key`.
///
/// Fails with a `Config` error when the provider needs a key and none is set.
pub fn resolve_api_key(config: &HawxConfig) -> Result<String, HawxError> {
    let from_env = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
    let from_config = config.llm.as_ref()
        .and_then(|l| l.api_key.as_deref())
        .map(resolve_credential)
        .filter(|k| !k.trim().is_empty() && !k.starts_with('$'));

    match from_env.or(from_config) {
        Some(key) => Ok(key),
        None if !catalog::requires_api_key(config.provider()) => Ok(String::new()),
        None => Err(HawxError::Config(format!(
            "{} must be set for provider '{}'",
            API_KEY_ENV,
            config.provider()
        ))),
    }
}
