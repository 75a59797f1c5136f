use std::sync::Arc;

use console::style;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::DEFAULT_WORKERS;
use crate::models::{CommandOutcome, ExecutionStatus};
use crate::runner::CommandRunner;
use crate::utils::formatting::format_duration;
use super::approval::{Approval, CommandApprover, ConsoleApprover};
use super::state::Records;
use super::status::{lock, spawn_supervisor, CommandState, StatusTable};

/// Aggregate of one finished layer.
#[derive(Debug, Clone, Default)]
pub struct LayerResult {
    /// Follow-up commands from every command, in submission order.
    pub recommended: Vec<String>,
    /// Services from every command, duplicates kept.
    pub services: Vec<String>,
    /// Outcomes of the commands that ran, in submission order.
    pub outcomes: Vec<CommandOutcome>,
    pub skipped: usize,
}

impl LayerResult {
    fn absorb(&mut self, outcome: CommandOutcome) {
        self.recommended.extend(outcome.recommended_steps().iter().cloned());
        self.services.extend(outcome.services_found().iter().cloned());
        self.outcomes.push(outcome);
    }
}

/// Runs the commands of one layer, sequentially or on a bounded worker pool.
pub struct LayerOrchestrator {
    runner: Arc<CommandRunner>,
    records: Arc<RwLock<Records>>,
    approver: Arc<dyn CommandApprover>,
    concurrent: bool,
    workers: usize,
    show_progress: bool,
}

impl LayerOrchestrator {
    pub fn new(runner: Arc<CommandRunner>, records: Arc<RwLock<Records>>) -> Self {
        Self {
            runner,
            records,
            approver: Arc::new(ConsoleApprover),
            concurrent: false,
            workers: DEFAULT_WORKERS,
            show_progress: false,
        }
    }

    pub fn with_approver(mut self, approver: Arc<dyn CommandApprover>) -> Self {
        self.approver = approver;
        self
    }

    pub fn with_concurrency(mut self, concurrent: bool, workers: usize) -> Self {
        self.concurrent = concurrent;
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn approver(&self) -> &Arc<dyn CommandApprover> {
        &self.approver
    }

    /// Run every command of `layer` to a terminal state and aggregate the results.
    ///
    /// Discovered services are also added to the shared records as each
    /// command finishes. Interactive layers always run sequentially.
    pub async fn run_layer(&self, commands: &[String], layer: i32, interactive: bool) -> LayerResult {
        if commands.is_empty() {
            info!(layer, "No commands for layer");
            return LayerResult::default();
        }

        info!(layer, commands = commands.len(), concurrent = self.concurrent && !interactive, "Starting layer");
        let result = if self.concurrent && !interactive {
            self.run_concurrent(commands, layer).await
        } else {
            if self.concurrent {
                info!(layer, "Interactive approval requested, running layer sequentially");
            }
            self.run_sequential(commands, layer, interactive).await
        };

        info!(
            layer,
            ran = result.outcomes.len(),
            skipped = result.skipped,
            recommended = result.recommended.len(),
            services = result.services.len(),
            "Layer complete"
        );
        result
    }

    async fn run_sequential(&self, commands: &[String], layer: i32, interactive: bool) -> LayerResult {
        let mut result = LayerResult::default();
        let mut ask = interactive;
        let total = commands.len();

        for (i, command) in commands.iter().enumerate() {
            let command = if ask {
                match self.approver.review(command, i + 1, total).await {
                    Ok(Approval::Run(c)) => c,
                    Ok(Approval::RunAll) => {
                        ask = false;
                        command.clone()
                    }
                    Ok(Approval::Skip) => {
                        info!(layer, command = %command, "Skipped by operator");
                        result.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(layer, command = %command, error = %e, "Approval prompt failed, skipping command");
                        result.skipped += 1;
                        continue;
                    }
                }
            } else {
                command.clone()
            };

            if self.show_progress {
                println!("  {} {} {}", style("▸").cyan(), style(format!("[{}/{}]", i + 1, total)).dim(), command);
            }
            let outcome = self.runner.run(&command, layer).await;
            if self.show_progress {
                print_finished(&outcome);
            }

            self.records.write().await.add_services(outcome.services_found().iter().cloned());
            result.absorb(outcome);
        }
        result
    }

    async fn run_concurrent(&self, commands: &[String], layer: i32) -> LayerResult {
        let status = StatusTable::shared(commands);
        let cancel = CancellationToken::new();
        let supervisor = self
            .show_progress
            .then(|| spawn_supervisor(status.clone(), cancel.clone()));
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let handles: Vec<_> = commands
            .iter()
            .enumerate()
            .map(|(index, command)| {
                let runner = self.runner.clone();
                let records = self.records.clone();
                let status = status.clone();
                let semaphore = semaphore.clone();
                let command = command.clone();

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        lock(&status).set_state(index, CommandState::Error);
                        return None;
                    };
                    lock(&status).set_state(index, CommandState::Running);

                    let line_status = status.clone();
                    let outcome = runner
                        .run_observed(&command, layer, move |line| lock(&line_status).record_line(index, line))
                        .await;

                    records.write().await.add_services(outcome.services_found().iter().cloned());
                    lock(&status).set_state(index, state_of(&outcome));
                    Some(outcome)
                })
            })
            .collect();

        // Layer barrier: every task reaches a terminal state before aggregation.
        let joined = futures::future::join_all(handles).await;

        let mut result = LayerResult::default();
        for (index, joined) in joined.into_iter().enumerate() {
            match joined {
                Ok(Some(outcome)) => result.absorb(outcome),
                Ok(None) => warn!(layer, command = %commands[index], "Worker pool closed before command ran"),
                Err(e) => {
                    error!(layer, command = %commands[index], error = %e, "Command task panicked");
                    lock(&status).set_state(index, CommandState::Error);
                }
            }
        }

        cancel.cancel();
        if let Some(handle) = supervisor {
            if let Err(e) = handle.await {
                warn!(error = %e, "Status display task failed");
            }
        }
        result
    }
}

fn state_of(outcome: &CommandOutcome) -> CommandState {
    match outcome.record.status {
        ExecutionStatus::Success => CommandState::Done,
        ExecutionStatus::Timeout | ExecutionStatus::Error => CommandState::Error,
    }
}

fn print_finished(outcome: &CommandOutcome) {
    let elapsed = format_duration((outcome.record.execution_time * 1000.0) as u64);
    let mark = match outcome.record.status {
        ExecutionStatus::Success => style("✔").green(),
        ExecutionStatus::Timeout => style("⏱").yellow(),
        ExecutionStatus::Error => style("✖").red(),
    };
    println!(
        "    {} {} {} {}",
        mark,
        outcome.record.tool,
        style(outcome.record.status.as_str()).dim(),
        style(elapsed).dim()
    );
}
