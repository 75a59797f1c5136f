use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::analysis::{parse_with_repair, Repairer, SummaryRequest, Summarizer};
use crate::audit::LogLedger;
use crate::config::DEFAULT_CONTEXT_LENGTH;
use crate::models::{CommandOutcome, ExecutionStart, ExecutionStatus, StepAnalysis};
use crate::utils::text::{chunk_by_tokens, estimate_tokens};
use super::argv::{tool_name, Invocation};
use super::filters::OutputFilters;
use super::process::{run_process, CommandLog};
use super::TimeoutPolicy;

/// Tokens reserved for the prompt around a chunk of output.
const PROMPT_RESERVE: usize = 1000;
const RELATED_LIMIT: usize = 3;

/// Executes one command, logs it, and turns its output into a `StepAnalysis`.
pub struct CommandRunner {
    target_dir: PathBuf,
    ledger: Arc<LogLedger>,
    summarizer: Arc<dyn Summarizer>,
    repairer: Arc<dyn Repairer>,
    filters: OutputFilters,
    timeouts: TimeoutPolicy,
    context_length: usize,
}

impl CommandRunner {
    pub fn new(
        target_dir: &Path,
        ledger: Arc<LogLedger>,
        summarizer: Arc<dyn Summarizer>,
        repairer: Arc<dyn Repairer>,
        timeouts: TimeoutPolicy,
    ) -> Self {
        Self {
            target_dir: target_dir.to_path_buf(),
            ledger,
            summarizer,
            repairer,
            filters: OutputFilters::default(),
            timeouts,
            context_length: DEFAULT_CONTEXT_LENGTH,
        }
    }

    pub fn with_filters(mut self, filters: OutputFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_context_length(mut self, context_length: usize) -> Self {
        self.context_length = context_length;
        self
    }

    pub fn ledger(&self) -> &Arc<LogLedger> {
        &self.ledger
    }

    pub async fn run(&self, command: &str, layer: i32) -> CommandOutcome {
        self.run_observed(command, layer, |_| {}).await
    }

    /// Run `command` for `layer`; `on_line` sees each output line as it arrives.
    ///
    /// Never fails: spawn errors, timeouts and unusable summaries all come
    /// back as an outcome without analysis.
    pub async fn run_observed<F>(&self, command: &str, layer: i32, on_line: F) -> CommandOutcome
    where
        F: FnMut(&str),
    {
        let command = command.trim();
        let tool = tool_name(command);
        let log_path = self.log_path(&tool);
        let relative_log = log_path
            .strip_prefix(&self.target_dir)
            .unwrap_or(&log_path)
            .display()
            .to_string();

        let invocation = Invocation::parse(command);
        let argv = invocation.as_ref().map(Invocation::argv).unwrap_or_default();
        let start = ExecutionStart::begin(&tool, command, argv.clone(), relative_log, layer);

        info!(tool = %tool, layer, command = %command, "Running command");

        let output = match invocation {
            Ok(_) => match CommandLog::create(&log_path, command).await {
                Ok(mut log) => {
                    let policy = self.timeouts.for_layer(layer);
                    let result = run_process(&argv, &policy, &mut log, on_line).await;
                    if let Err(e) = &result {
                        if let Err(log_err) = log.write_line(&format!("[error] {}", e)).await {
                            debug!(error = %log_err, "Could not note failure in command log");
                        }
                    }
                    result
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %tool, command = %command, error = %e, "Command failed to run");
                return self.finish(start.finish(ExecutionStatus::Error), None).await;
            }
        };

        if let Some(kind) = output.timed_out {
            warn!(tool = %tool, command = %command, timeout = kind.as_str(), "Command timed out");
            return self.finish(start.finish(ExecutionStatus::Timeout), None).await;
        }

        let record = start.finish(output.status());
        debug!(
            tool = %tool,
            lines = output.lines.len(),
            exit_code = ?output.exit_code,
            secs = record.execution_time,
            "Command finished"
        );

        let filtered = self.filters.apply(&tool, &output.text());
        let analysis = self.summarize(command, &filtered).await;
        if analysis.is_none() {
            warn!(tool = %tool, command = %command, "No usable summary for command output");
        }
        self.finish(record, analysis).await
    }

    async fn finish(
        &self,
        record: crate::models::ExecutionRecord,
        analysis: Option<StepAnalysis>,
    ) -> CommandOutcome {
        if let Err(e) = self.ledger.append(&record, analysis.as_ref()).await {
            warn!(tool = %record.tool, error = %e, "Failed to append to run logs");
        }
        CommandOutcome { record, analysis }
    }

    fn log_path(&self, tool: &str) -> PathBuf {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let tool = if tool.is_empty() { "command" } else { tool };
        self.target_dir.join("logs").join(format!("{}_{}.txt", tool, &id[..8]))
    }

    /// Summarize `output`, chunking it when it exceeds the context budget.
    async fn summarize(&self, command: &str, output: &str) -> Option<StepAnalysis> {
        let previous_commands = self.ledger.previous_commands().await;
        let related = self.ledger.related_summaries(command, RELATED_LIMIT).await;
        let similar_context = (!related.is_empty()).then(|| {
            related
                .iter()
                .map(|r| format!("- `{}`: {}", r.command, r.summary))
                .collect::<Vec<_>>()
                .join("\n")
        });

        let budget = self.context_length.saturating_sub(PROMPT_RESERVE).max(PROMPT_RESERVE);
        let chunks = if estimate_tokens(output) > budget {
            chunk_by_tokens(output, budget)
        } else {
            vec![output.to_string()]
        };
        if chunks.len() > 1 {
            info!(command = %command, chunks = chunks.len(), "Output exceeds context, summarizing in chunks");
        }

        let mut combined: Option<StepAnalysis> = None;
        for chunk in &chunks {
            let request = SummaryRequest {
                command,
                output: chunk,
                previous_commands: &previous_commands,
                similar_context: similar_context.as_deref(),
                previous_summary: combined.as_ref().map(|a| a.summary.as_str()),
            };
            let parsed = match self.summarizer.summarize(request).await {
                Ok(raw) => parse_with_repair::<StepAnalysis>(&raw, self.repairer.as_ref(), command).await,
                Err(e) => {
                    warn!(command = %command, error = %e, "Summarizer call failed");
                    None
                }
            };
            match (combined.as_mut(), parsed) {
                (Some(acc), Some(next)) => acc.merge(next),
                (None, Some(next)) => combined = Some(next),
                (_, None) => {}
            }
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HawxError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ScriptedSummarizer {
        answers: Mutex<Vec<String>>,
        requests: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedSummarizer {
        fn new(answers: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.iter().rev().map(|s| s.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Summarizer for ScriptedSummarizer {
        async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String, HawxError> {
            self.requests.lock().unwrap().push((
                request.output.to_string(),
                request.previous_summary.map(str::to_string),
            ));
            self.answers
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| HawxError::LLMApi("no scripted answer".into()))
        }

        async fn executive_summary(&self, _: &str, _: &str, _: Option<&str>) -> Result<String, HawxError> {
            Ok(String::new())
        }
    }

    struct NoRepair;

    #[async_trait]
    impl Repairer for NoRepair {
        async fn repair(&self, malformed: &str) -> Result<String, HawxError> {
            Ok(malformed.to_string())
        }
    }

    fn policy() -> TimeoutPolicy {
        TimeoutPolicy {
            idle: Duration::from_millis(400),
            total: Duration::from_secs(10),
            baseline_multiplier: 1,
            grace: Duration::from_millis(200),
        }
    }

    fn runner(dir: &TempDir, summarizer: Arc<ScriptedSummarizer>) -> CommandRunner {
        let ledger = Arc::new(LogLedger::new(dir.path()));
        CommandRunner::new(dir.path(), ledger, summarizer, Arc::new(NoRepair), policy())
    }

    const ANSWER: &str = r#"{"summary":"found admin","recommended_steps":["curl http://x/admin"],"services_found":["nginx 1.18"]}"#;

    #[tokio::test]
    async fn test_successful_command_is_summarized_and_logged() {
        let dir = TempDir::new().unwrap();
        let summarizer = ScriptedSummarizer::new(&[ANSWER]);
        let runner = runner(&dir, summarizer.clone());

        let outcome = runner.run("echo /admin 301", 0).await;
        assert_eq!(outcome.record.status, ExecutionStatus::Success);
        assert_eq!(outcome.recommended_steps(), ["curl http://x/admin"]);
        assert_eq!(outcome.services_found(), ["nginx 1.18"]);
        assert!(outcome.record.output_file.starts_with("logs/echo_"));

        let log = std::fs::read_to_string(dir.path().join(&outcome.record.output_file)).unwrap();
        assert!(log.contains("# Command: echo /admin 301"));
        assert!(log.contains("/admin 301"));
        assert_eq!(summarizer.requests.lock().unwrap()[0].0, "/admin 301");
        assert_eq!(runner.ledger().previous_commands().await, vec!["echo /admin 301"]);
    }

    #[tokio::test]
    async fn test_missing_binary_yields_empty_error_result() {
        let dir = TempDir::new().unwrap();
        let summarizer = ScriptedSummarizer::new(&[]);
        let outcome = runner(&dir, summarizer.clone()).run("hawx-missing-tool --flag", 1).await;
        assert_eq!(outcome.record.status, ExecutionStatus::Error);
        assert!(outcome.analysis.is_none());
        assert!(summarizer.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_yields_empty_result_with_partial_log() {
        let dir = TempDir::new().unwrap();
        let summarizer = ScriptedSummarizer::new(&[ANSWER]);
        let outcome = runner(&dir, summarizer.clone()).run("echo started; sleep 20", 0).await;
        assert_eq!(outcome.record.status, ExecutionStatus::Timeout);
        assert!(outcome.analysis.is_none());
        let log = std::fs::read_to_string(dir.path().join(&outcome.record.output_file)).unwrap();
        assert!(log.contains("started"));
        assert!(summarizer.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_summary_is_empty_result() {
        let dir = TempDir::new().unwrap();
        let summarizer = ScriptedSummarizer::new(&["definitely not json"]);
        let outcome = runner(&dir, summarizer).run("echo hi", 0).await;
        assert_eq!(outcome.record.status, ExecutionStatus::Success);
        assert!(outcome.analysis.is_none());
    }

    #[tokio::test]
    async fn test_long_output_is_chunked_with_running_summary() {
        let dir = TempDir::new().unwrap();
        let first = r#"{"summary":"part one","recommended_steps":["a"],"services_found":["ssh 8.2"]}"#;
        let second = r#"{"summary":"part two","recommended_steps":["b"],"services_found":[]}"#;
        let summarizer = ScriptedSummarizer::new(&[first, second]);
        let runner = runner(&dir, summarizer.clone()).with_context_length(1600);

        // 160 lines of 4 tokens against a 600-token budget: two chunks.
        let outcome = runner.run("seq -f 'line %g of output' 1 160", 0).await;
        let analysis = outcome.analysis.unwrap();
        assert_eq!(analysis.summary, "part two");
        assert_eq!(analysis.recommended_steps, vec!["a", "b"]);

        let requests = summarizer.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, None);
        assert_eq!(requests[1].1.as_deref(), Some("part one"));
    }
}
