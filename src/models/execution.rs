use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::StepAnalysis;

/// Terminal state of one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Timeout,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finalized command invocation, as appended to `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Tool name (basename of argv[0]).
    pub tool: String,
    /// The command string as scheduled.
    pub command: String,
    /// The argv actually launched.
    pub args: Vec<String>,
    /// Invocation start.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration in seconds.
    pub execution_time: f64,
    /// Raw log file path.
    pub output_file: String,
    /// Originating layer; the baseline is -1.
    pub layer: i32,
    pub status: ExecutionStatus,
}

/// An invocation that has started but not reached a terminal state.
///
/// Finalizing consumes it, so a record can never change after it is produced.
#[derive(Debug)]
pub struct ExecutionStart {
    pub tool: String,
    pub command: String,
    pub args: Vec<String>,
    pub output_file: String,
    pub layer: i32,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl ExecutionStart {
    pub fn begin(
        tool: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        output_file: impl Into<String>,
        layer: i32,
    ) -> Self {
        Self {
            tool: tool.into(),
            command: command.into(),
            args,
            output_file: output_file.into(),
            layer,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub fn finish(self, status: ExecutionStatus) -> ExecutionRecord {
        ExecutionRecord {
            tool: self.tool,
            command: self.command,
            args: self.args,
            timestamp: self.started_at,
            execution_time: self.clock.elapsed().as_secs_f64(),
            output_file: self.output_file,
            layer: self.layer,
            status,
        }
    }
}

/// What the runner hands back for one command.
///
/// `analysis` is `None` for the empty result: missing binary, timeout, or an
/// unparseable summary.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub record: ExecutionRecord,
    pub analysis: Option<StepAnalysis>,
}

impl CommandOutcome {
    pub fn recommended_steps(&self) -> &[String] {
        self.analysis.as_ref().map_or(&[], |a| a.recommended_steps.as_slice())
    }

    pub fn services_found(&self) -> &[String] {
        self.analysis.as_ref().map_or(&[], |a| a.services_found.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_keeps_identity_fields() {
        let start = ExecutionStart::begin(
            "nmap",
            "nmap -p- 10.0.0.1",
            vec!["nmap".into(), "-p-".into(), "10.0.0.1".into()],
            "logs/nmap_deadbeef.txt",
            -1,
        );
        let record = start.finish(ExecutionStatus::Timeout);
        assert_eq!(record.tool, "nmap");
        assert_eq!(record.layer, -1);
        assert_eq!(record.status, ExecutionStatus::Timeout);
        assert!(record.execution_time >= 0.0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ExecutionStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }

    #[test]
    fn test_empty_outcome_contributes_nothing() {
        let record = ExecutionStart::begin("x", "x", vec![], "", 0).finish(ExecutionStatus::Error);
        let outcome = CommandOutcome { record, analysis: None };
        assert!(outcome.recommended_steps().is_empty());
        assert!(outcome.services_found().is_empty());
    }
}
