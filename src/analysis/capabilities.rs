use async_trait::async_trait;

use crate::errors::HawxError;

/// Input for one summarization call.
///
/// `previous_summary` is set when `output` is a later chunk of a long output.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub command: &'a str,
    pub output: &'a str,
    pub previous_commands: &'a [String],
    pub similar_context: Option<&'a str>,
    pub previous_summary: Option<&'a str>,
}

/// Turns raw tool output into the JSON text of a `StepAnalysis`.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, HawxError>;

    /// Fold `material` into a running Markdown executive summary.
    async fn executive_summary(
        &self,
        target: &str,
        material: &str,
        previous: Option<&str>,
    ) -> Result<String, HawxError>;
}

/// Judges functional redundancy; answers with the JSON text of a `DedupResponse`.
#[async_trait]
pub trait DedupOracle: Send + Sync {
    async fn deduplicate(&self, current: &[String], prior: &[String]) -> Result<String, HawxError>;
}

/// Rewrites malformed structured output into (hopefully) valid JSON text.
#[async_trait]
pub trait Repairer: Send + Sync {
    async fn repair(&self, malformed: &str) -> Result<String, HawxError>;
}

/// Looks up public exploits for one service string.
#[async_trait]
pub trait ExploitLookup: Send + Sync {
    async fn lookup(&self, service: &str) -> Result<String, HawxError>;
}
