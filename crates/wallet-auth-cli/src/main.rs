/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Wallet login, link, logout and status results on stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

mod cli;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::commands::{self, AuthContext};
use wallet_auth_adapter::{AttemptKind, AuthOutcome};
use wallet_auth_cli::AppConfig;

/// Exit status after Ctrl-C
const EXIT_ABORTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "wallet-auth", version, about = "Wallet-signature login and wallet linking")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,
    /// Accept every wallet prompt without asking
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a configuration file
    Init {
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
    /// Sign in with the local wallet
    Login,
    /// Link the local wallet to the signed-in account
    Link,
    /// Forget the stored session
    Logout,
    /// Show wallet and session status
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    if let Command::Init { output, force } = args.command {
        let output = output
            .or(args.config_path)
            .or_else(AppConfig::default_path)
            .context("could not determine a config path, pass --output")?;
        cli::init::run_init(output, args.yes, force)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = AppConfig::load(args.config_path.as_deref()).context("load config")?;
    info!(api_base_url = %config.api_base_url, wallet = %config.wallet_name, "configuration loaded");

    match args.command {
        Command::Init { .. } => Ok(ExitCode::SUCCESS),
        Command::Login => run_attempt(&config, AttemptKind::Login, args.yes).await,
        Command::Link => run_attempt(&config, AttemptKind::Link, args.yes).await,
        Command::Logout => print_json(&commands::logout(&config)?),
        Command::Status => print_json(&commands::status(&config)?),
    }
}

async fn run_attempt(config: &AppConfig, kind: AttemptKind, assume_yes: bool) -> Result<ExitCode> {
    let context = AuthContext::build(config, assume_yes)?;
    let shutdown = CancellationToken::new();
    setup_signal_handler(shutdown.clone());

    let Some(outcome) = commands::run_attempt(&context, kind, shutdown).await else {
        eprintln!("Aborted.");
        // A terminal prompt may still be blocking a runtime thread
        std::process::exit(EXIT_ABORTED);
    };

    print_outcome(&outcome)?;
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_outcome(outcome: &AuthOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("serialize outcome")?;
    println!("{json}");
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<ExitCode> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown.cancel();
    });
}
