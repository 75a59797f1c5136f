use clap::{Args, Parser, Subcommand};

use crate::config::MAX_STEPS;

#[derive(Parser)]
#[command(name = "hawx", version, about = "LLM-assisted multi-layer reconnaissance agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress the banner and live progress
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the recon workflow against a target
    Run(RunArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// IP address, domain, or http(s):// URL
    pub target: String,

    /// Layers to run after the baseline scan
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=MAX_STEPS as i64))]
    pub steps: Option<u8>,

    /// Approve, edit or skip each command before it runs
    #[arg(short, long)]
    pub interactive: bool,

    /// Run each layer on a worker pool
    #[arg(long)]
    pub concurrent: bool,

    /// Worker pool size for --concurrent
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Idle timeout in seconds (no output for this long kills the command)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Total timeout in seconds per command
    #[arg(long)]
    pub total_timeout: Option<u64>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for per-target results
    #[arg(short, long)]
    pub output: Option<String>,

    /// LLM provider: groq, openai, openrouter, ollama
    #[arg(long)]
    pub provider: Option<String>,

    /// LLM model identifier
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "hawx", "-vv", "run", "10.10.11.58", "--steps", "3", "--concurrent", "-w", "4", "-t", "60",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        assert_eq!(args.target, "10.10.11.58");
        assert_eq!(args.steps, Some(3));
        assert!(args.concurrent);
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.timeout, Some(60));
    }

    #[test]
    fn test_steps_bounded() {
        assert!(Cli::try_parse_from(["hawx", "run", "x.com", "--steps", "6"]).is_err());
        assert!(Cli::try_parse_from(["hawx", "run", "x.com", "--steps", "0"]).is_err());
    }

    #[test]
    fn test_validate_subcommand() {
        let cli = Cli::try_parse_from(["hawx", "--no-color", "validate", "hawx.yaml"]).unwrap();
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Validate(ref a) if a.config == "hawx.yaml"));
    }
}
