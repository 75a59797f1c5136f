use clap::Parser;
use tracing_subscriber::EnvFilter;

use hawx::cli::{self, Commands};
use hawx::errors::HawxError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let result = match cli.command {
        Commands::Run(args) => cli::run::handle_run(args, cli.quiet).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            HawxError::Config(_) => 2,
            HawxError::Authentication(_) => 4,
            HawxError::InvalidTarget(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), HawxError> {
    let path = std::path::PathBuf::from(&args.config);
    let config = hawx::config::parse_config(&path).await?;
    let settings = config.recon_settings();
    println!("Configuration is valid: {}", args.config);
    println!(
        "  hawx {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("dev"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown")
    );
    println!("  provider: {}", config.provider());
    println!("  steps: {}, workers: {}, concurrent: {}", settings.steps, settings.workers, settings.concurrent);
    Ok(())
}
