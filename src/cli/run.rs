use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tracing::{debug, info};

use crate::analysis::LlmAnalyst;
use crate::cli::banner::print_banner;
use crate::cli::commands::RunArgs;
use crate::config::{self, HawxConfig, LLMConfig, ReconSettings};
use crate::errors::HawxError;
use crate::llm::{self, LLMProvider};
use crate::models::ReconReport;
use crate::pipeline::{Capabilities, ReconExecutor, Target};
use crate::runner::{OutputFilters, SearchsploitLookup};

/// Environment override for the idle timeout, in seconds.
pub const TIMEOUT_ENV: &str = "TIMEOUT";

pub async fn handle_run(args: RunArgs, quiet: bool) -> Result<(), HawxError> {
    let target = Target::parse(&args.target)?;

    let mut config = match &args.config {
        Some(path) => config::parse_config(Path::new(path)).await?,
        None => HawxConfig::default(),
    };
    apply_llm_overrides(&mut config, &args);
    let api_key = config::resolve_api_key(&config)?;

    let env_timeout = std::env::var(TIMEOUT_ENV).ok().and_then(|v| v.trim().parse::<u64>().ok());
    let settings = apply_run_overrides(config.recon_settings(), &args, env_timeout);
    let filters = OutputFilters::from_patterns(config.filters.as_ref().unwrap_or(&HashMap::new()))?;

    let llm_config = config.llm.clone().unwrap_or_default();
    let endpoint = match config.provider() {
        "ollama" => llm_config.ollama_host.as_deref().or(llm_config.base_url.as_deref()),
        _ => llm_config.base_url.as_deref(),
    };
    let provider: Arc<dyn LLMProvider> = Arc::from(llm::create_provider(
        config.provider(),
        &api_key,
        llm_config.model.as_deref(),
        endpoint,
    )?);
    info!(provider = provider.provider_name(), model = provider.model_name(), "LLM provider ready");

    let analyst = Arc::new(
        LlmAnalyst::new(provider)
            .with_tools(settings.available_tools.clone())
            .with_wordlists(vec![settings.web_wordlist.clone(), settings.dns_wordlist.clone()])
            .with_dedup_cap(settings.dedup_cap),
    );
    let capabilities = Capabilities {
        summarizer: analyst.clone(),
        oracle: analyst.clone(),
        repairer: analyst,
        exploits: Arc::new(SearchsploitLookup::new()),
    };

    if !quiet {
        print_banner(&target.raw, target.mode.as_str(), settings.steps);
    }
    debug!(?settings, "Resolved recon settings");

    let executor = ReconExecutor::new(target, settings, capabilities)
        .with_filters(filters)
        .with_interactive(args.interactive)
        .with_progress(!quiet);
    let report = executor.run().await?;

    print_report(&report);
    Ok(())
}

fn apply_llm_overrides(config: &mut HawxConfig, args: &RunArgs) {
    if args.provider.is_none() && args.model.is_none() {
        return;
    }
    let llm = config.llm.get_or_insert_with(LLMConfig::default);
    if let Some(provider) = &args.provider {
        llm.provider = Some(provider.clone());
    }
    if let Some(model) = &args.model {
        llm.model = Some(model.clone());
    }
}

/// Layer CLI flags and the `TIMEOUT` variable over the configured settings.
///
/// `--timeout` beats `TIMEOUT`, which beats the config file.
pub fn apply_run_overrides(mut settings: ReconSettings, args: &RunArgs, env_timeout: Option<u64>) -> ReconSettings {
    if let Some(steps) = args.steps {
        settings.steps = steps;
    }
    if args.concurrent {
        settings.concurrent = true;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers.max(1);
    }
    if let Some(idle) = args.timeout.or(env_timeout).filter(|s| *s > 0) {
        settings.timeouts.idle = Duration::from_secs(idle);
    }
    if let Some(total) = args.total_timeout.filter(|s| *s > 0) {
        settings.timeouts.total = Duration::from_secs(total);
    }
    if let Some(output) = &args.output {
        settings.output_dir = PathBuf::from(output);
    }
    settings
}

fn print_report(report: &ReconReport) {
    println!();
    println!(
        "  {} Recon complete: {} layer(s), {} service(s)",
        style("\u{2714}").green().bold(),
        report.layers_executed,
        report.services.len()
    );
    for service in &report.services {
        println!("    {} {}", style("-").dim(), service);
    }
    println!("  {:<18} {}", style("results").dim(), report.target_dir.display());
    if let Some(path) = &report.exploits_file {
        println!("  {:<18} {}", style("exploit findings").dim(), path.display());
    }
    if let Some(path) = &report.executive_summary {
        println!("  {:<18} {}", style("executive summary").dim(), path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::cli::commands::{Cli, Commands};

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["hawx", "run"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_flag_beats_env_beats_config() {
        let base = ReconSettings::default();
        let from_env = apply_run_overrides(base.clone(), &run_args(&["x.com"]), Some(30));
        assert_eq!(from_env.timeouts.idle, Duration::from_secs(30));

        let from_flag = apply_run_overrides(base.clone(), &run_args(&["x.com", "-t", "90"]), Some(30));
        assert_eq!(from_flag.timeouts.idle, Duration::from_secs(90));

        let untouched = apply_run_overrides(base.clone(), &run_args(&["x.com"]), None);
        assert_eq!(untouched.timeouts.idle, base.timeouts.idle);
    }

    #[test]
    fn test_run_overrides() {
        let s = apply_run_overrides(
            ReconSettings::default(),
            &run_args(&["x.com", "--steps", "4", "--concurrent", "-w", "0", "--total-timeout", "900", "-o", "out"]),
            None,
        );
        assert_eq!(s.steps, 4);
        assert!(s.concurrent);
        assert_eq!(s.workers, 1);
        assert_eq!(s.timeouts.total, Duration::from_secs(900));
        assert_eq!(s.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_llm_overrides_create_section() {
        let mut config = HawxConfig::default();
        apply_llm_overrides(&mut config, &run_args(&["x.com", "--provider", "ollama", "--model", "llama3"]));
        assert_eq!(config.provider(), "ollama");
        assert_eq!(config.llm.unwrap().model.as_deref(), Some("llama3"));
    }
}
