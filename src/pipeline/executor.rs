use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::analysis::{DedupOracle, ExploitLookup, Repairer, Summarizer};
use crate::audit::LogLedger;
use crate::config::{ReconSettings, MAX_STEPS};
use crate::errors::HawxError;
use crate::models::{ReconReport, TargetMode};
use crate::reporting::{assemble_executive_summary, write_exploit_findings};
use crate::runner::{CommandRunner, OutputFilters};
use super::approval::{CommandApprover, ConsoleApprover};
use super::dedup::LayerDeduplicator;
use super::orchestrator::LayerOrchestrator;
use super::phase::ReconPhase;
use super::state::{Records, BASELINE_LAYER, DEFAULT_SLOTS};
use super::target::{detect_web_url, web_commands, Target, WebPorts, WebWordlists};

/// The external capabilities a workflow needs.
#[derive(Clone)]
pub struct Capabilities {
    pub summarizer: Arc<dyn Summarizer>,
    pub oracle: Arc<dyn DedupOracle>,
    pub repairer: Arc<dyn Repairer>,
    pub exploits: Arc<dyn ExploitLookup>,
}

/// Drives one target from the baseline scan through the final report.
pub struct ReconExecutor {
    target: Target,
    settings: ReconSettings,
    capabilities: Capabilities,
    approver: Arc<dyn CommandApprover>,
    filters: OutputFilters,
    baseline: Option<Vec<String>>,
    interactive: bool,
    show_progress: bool,
}

impl ReconExecutor {
    pub fn new(target: Target, settings: ReconSettings, capabilities: Capabilities) -> Self {
        Self {
            target,
            settings,
            capabilities,
            approver: Arc::new(ConsoleApprover),
            filters: OutputFilters::default(),
            baseline: None,
            interactive: false,
            show_progress: false,
        }
    }

    pub fn with_filters(mut self, filters: OutputFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_approver(mut self, approver: Arc<dyn CommandApprover>) -> Self {
        self.approver = approver;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Replace the mode's default baseline commands.
    pub fn with_baseline(mut self, commands: Vec<String>) -> Self {
        self.baseline = Some(commands);
        self
    }

    /// Working directory of this target.
    pub fn target_dir(&self) -> PathBuf {
        self.settings.output_dir.join(self.target.dir_name())
    }

    pub async fn run(&self) -> Result<ReconReport, HawxError> {
        let steps = self.settings.steps.clamp(1, MAX_STEPS);
        let target_dir = self.target_dir();
        prepare_target_dir(&target_dir).await?;
        info!(
            target = %self.target.raw,
            mode = %self.target.mode,
            steps,
            dir = %target_dir.display(),
            "Starting recon workflow"
        );

        let ledger = Arc::new(LogLedger::new(&target_dir));
        let runner = Arc::new(
            CommandRunner::new(
                &target_dir,
                ledger,
                self.capabilities.summarizer.clone(),
                self.capabilities.repairer.clone(),
                self.settings.timeouts,
            )
            .with_filters(self.filters.clone())
            .with_context_length(self.settings.context_length),
        );
        let records = Arc::new(RwLock::new(Records::new(DEFAULT_SLOTS.max(usize::from(steps) + 2))));
        let orchestrator = LayerOrchestrator::new(runner, records.clone())
            .with_approver(self.approver.clone())
            .with_concurrency(self.settings.concurrent, self.settings.workers)
            .with_progress(self.show_progress);
        let dedup = LayerDeduplicator::new(self.capabilities.oracle.clone(), self.capabilities.repairer.clone())
            .with_threshold(self.settings.dedup_threshold)
            .with_cap(self.settings.dedup_cap);

        let mut phase = ReconPhase::start();
        let mut layers_executed = 0;
        let mut exploits_file = None;
        let mut executive_summary = None;

        loop {
            match phase {
                ReconPhase::Layer(layer) => {
                    self.announce(&phase);
                    let (commands, interactive) = if layer == BASELINE_LAYER {
                        let commands = self.baseline_commands().await;
                        records.write().await.set_layer(BASELINE_LAYER, commands.clone());
                        // A menu-selected web baseline is not reviewed twice.
                        let reviewed = self.interactive && self.target.mode == TargetMode::Website;
                        (commands, self.interactive && !reviewed)
                    } else {
                        (records.read().await.layer(layer).to_vec(), self.interactive)
                    };

                    let result = orchestrator.run_layer(&commands, layer, interactive).await;
                    if layer != BASELINE_LAYER {
                        layers_executed += 1;
                    }

                    let mut candidates = result.recommended;
                    if layer == BASELINE_LAYER && self.target.mode == TargetMode::Host {
                        candidates.extend(self.web_followups(&target_dir).await);
                    }

                    let next = layer + 1;
                    let snapshot = records.read().await.clone();
                    let reduced = dedup.reduce(&candidates, &snapshot, next).await;
                    info!(layer = next, commands = reduced.len(), "Next layer resolved");
                    if !records.write().await.set_layer(next, reduced) {
                        warn!(layer = next, "No record slot for layer");
                    }
                }
                ReconPhase::Finalize => {
                    self.announce(&phase);
                    let services = records.read().await.unique_services();
                    exploits_file =
                        match write_exploit_findings(&target_dir, self.capabilities.exploits.as_ref(), &services)
                            .await
                        {
                            Ok(path) => path,
                            Err(e) => {
                                warn!(error = %e, "Failed to write exploit findings");
                                None
                            }
                        };
                    executive_summary = match assemble_executive_summary(
                        &target_dir,
                        self.capabilities.summarizer.as_ref(),
                        &self.target.raw,
                        self.settings.context_length,
                    )
                    .await
                    {
                        Ok(path) => path,
                        Err(e) => {
                            warn!(error = %e, "Failed to write executive summary");
                            None
                        }
                    };
                }
                ReconPhase::Done => break,
            }
            phase = phase.next(steps);
        }

        let records = records.read().await;
        let report = ReconReport {
            target: self.target.raw.clone(),
            mode: self.target.mode,
            layers_executed,
            commands: records.all_commands().to_vec(),
            services: records.unique_services(),
            target_dir,
            exploits_file,
            executive_summary,
        };
        info!(
            target = %report.target,
            layers = report.layers_executed,
            services = report.services.len(),
            "Recon workflow complete"
        );
        Ok(report)
    }

    fn wordlists(&self) -> WebWordlists {
        WebWordlists {
            web: self.settings.web_wordlist.clone(),
            dns: self.settings.dns_wordlist.clone(),
        }
    }

    async fn baseline_commands(&self) -> Vec<String> {
        if let Some(commands) = &self.baseline {
            return commands.clone();
        }
        let commands = self.target.baseline_commands(&self.wordlists());
        if self.interactive && self.target.mode == TargetMode::Website {
            return self.choose(commands).await;
        }
        commands
    }

    /// Web commands for a host whose baseline found a live web server.
    async fn web_followups(&self, target_dir: &Path) -> Vec<String> {
        let ports = WebPorts::from_logs(&target_dir.join("logs"), "nmap").await;
        if !ports.any() {
            return Vec::new();
        }
        let Some(url) = detect_web_url(&self.target.host, ports).await else {
            info!(host = %self.target.host, "Web ports reported but no HTTP response");
            return Vec::new();
        };
        let commands = web_commands(&url, &self.target, &self.wordlists());
        if self.interactive {
            return self.choose(commands).await;
        }
        commands
    }

    async fn choose(&self, commands: Vec<String>) -> Vec<String> {
        match self.approver.select(&commands).await {
            Ok(selected) => selected,
            Err(e) => {
                warn!(error = %e, "Selection menu failed, keeping all web commands");
                commands
            }
        }
    }

    fn announce(&self, phase: &ReconPhase) {
        if self.show_progress {
            println!();
            println!("  {} {}", style("■").cyan(), style(phase.display_name()).white().bold());
        }
    }
}

/// Remove any previous run's output and recreate the layout.
async fn prepare_target_dir(dir: &Path) -> Result<(), HawxError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => info!(dir = %dir.display(), "Removed previous results"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir.join("logs")).await?;
    Ok(())
}
