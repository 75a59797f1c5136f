use super::types::HawxError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl HawxError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        let (error_type, retryable) = match self {
            HawxError::RateLimit(_) => ("RateLimitError", true),
            HawxError::Network(_) => ("NetworkError", true),
            HawxError::Timeout(_) => ("TimeoutError", true),
            HawxError::LLMApi(_) => ("LLMApiError", true),
            HawxError::OutputValidation(_) => ("OutputValidationError", true),
            HawxError::Io(_) => ("IoError", true),

            HawxError::Config(_) => ("ConfigError", false),
            HawxError::Authentication(_) => ("AuthenticationError", false),
            HawxError::InvalidTarget(_) => ("InvalidTargetError", false),
            HawxError::Process(_) => ("ProcessError", false),
            HawxError::Json(_) => ("JsonError", false),
            HawxError::Yaml(_) => ("YamlError", false),
            HawxError::Regex(_) => ("RegexError", false),
            HawxError::Internal(_) => ("InternalError", false),
        };
        ErrorClassification { error_type, retryable }
    }
}
