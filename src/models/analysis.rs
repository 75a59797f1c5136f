use serde::{Deserialize, Serialize};

/// Structured summary of one tool's output.
///
/// All three fields are required; a response missing any of them is malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepAnalysis {
    pub summary: String,
    pub recommended_steps: Vec<String>,
    pub services_found: Vec<String>,
}

impl StepAnalysis {
    /// Fold a later chunk's analysis into this one. The later summary wins.
    pub fn merge(&mut self, next: StepAnalysis) {
        if !next.summary.trim().is_empty() {
            self.summary = next.summary;
        }
        self.recommended_steps.extend(next.recommended_steps);
        self.services_found.extend(next.services_found);
    }
}

/// Response shape of the deduplication oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupResponse {
    pub deduplicated_commands: Vec<String>,
}

/// Entry of `summary_data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub tool: String,
    pub command: String,
    pub summary: String,
    pub recommended_steps: Vec<String>,
    pub services_found: Vec<String>,
}

impl SummaryRecord {
    pub fn new(tool: &str, command: &str, analysis: &StepAnalysis) -> Self {
        Self {
            tool: tool.to_string(),
            command: command.to_string(),
            summary: analysis.summary.clone(),
            recommended_steps: analysis.recommended_steps.clone(),
            services_found: analysis.services_found.clone(),
        }
    }
}
