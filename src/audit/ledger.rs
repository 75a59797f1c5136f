use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::warn;

use crate::errors::HawxError;
use crate::models::{ExecutionRecord, StepAnalysis, SummaryRecord};
use crate::utils::similarity::similarity_ratio;
use super::utils::atomic_write;

pub const METADATA_FILE: &str = "metadata.json";
pub const SUMMARY_MD_FILE: &str = "summary.md";
pub const SUMMARY_JSON_FILE: &str = "summary_data.json";

/// Minimum command similarity for an earlier summary to count as related context.
const RELATED_THRESHOLD: f64 = 0.5;

/// The three append-only logs of one target.
///
/// Every append is a read-modify-write of a shared file, so all of them go
/// through one lock.
pub struct LogLedger {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LogLedger {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), lock: Mutex::new(()) }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn summary_md_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_MD_FILE)
    }

    pub fn summary_json_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_JSON_FILE)
    }

    /// Append an execution record, plus the summary entries when `analysis` is present.
    pub async fn append(
        &self,
        record: &ExecutionRecord,
        analysis: Option<&StepAnalysis>,
    ) -> Result<(), HawxError> {
        let _guard = self.lock.lock().await;

        let mut records: Vec<ExecutionRecord> = read_json_array(&self.metadata_path()).await;
        records.push(record.clone());
        atomic_write(&self.metadata_path(), &serde_json::to_string_pretty(&records)?).await?;

        if let Some(analysis) = analysis {
            let mut summaries: Vec<SummaryRecord> = read_json_array(&self.summary_json_path()).await;
            summaries.push(SummaryRecord::new(&record.tool, &record.command, analysis));
            atomic_write(&self.summary_json_path(), &serde_json::to_string_pretty(&summaries)?).await?;

            let mut markdown = tokio::fs::read_to_string(self.summary_md_path()).await.unwrap_or_default();
            markdown.push_str(&render_section(&record.tool, &record.command, analysis));
            atomic_write(&self.summary_md_path(), &markdown).await?;
        }
        Ok(())
    }

    pub async fn execution_records(&self) -> Vec<ExecutionRecord> {
        let _guard = self.lock.lock().await;
        read_json_array(&self.metadata_path()).await
    }

    /// Commands recorded so far, in execution order.
    pub async fn previous_commands(&self) -> Vec<String> {
        self.execution_records().await.into_iter().map(|r| r.command).collect()
    }

    /// Summaries of up to `limit` earlier commands that resemble `command`, most similar first.
    pub async fn related_summaries(&self, command: &str, limit: usize) -> Vec<SummaryRecord> {
        let summaries: Vec<SummaryRecord> = {
            let _guard = self.lock.lock().await;
            read_json_array(&self.summary_json_path()).await
        };

        let mut scored: Vec<(f64, SummaryRecord)> = summaries
            .into_iter()
            .map(|s| (similarity_ratio(command, &s.command), s))
            .filter(|(score, _)| *score >= RELATED_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, s)| s).collect()
    }
}

async fn read_json_array<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt log file, starting a fresh array");
            Vec::new()
        }
    }
}

/// One `## tool` section of `summary.md`.
pub fn render_section(tool: &str, command: &str, analysis: &StepAnalysis) -> String {
    let mut out = format!("## {}\n\n", tool);
    out.push_str(&format!("**Command Executed:**\n```\n{}\n```\n\n", command));
    out.push_str(&format!("**Summary:**\n{}\n\n", analysis.summary.trim()));

    out.push_str("**Recommended Steps:**\n");
    if analysis.recommended_steps.is_empty() {
        out.push_str("- None\n");
    }
    for step in &analysis.recommended_steps {
        out.push_str(&format!("- `{}`\n", step));
    }

    out.push_str("\n**Services Found:**\n");
    if analysis.services_found.is_empty() {
        out.push_str("- None\n");
    }
    for service in &analysis.services_found {
        out.push_str(&format!("- {}\n", service));
    }
    out.push('\n');
    out
}
