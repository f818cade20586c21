use agromind::config::Config;
use agromind::conversation::{ConversationController, Rejection, SubmitOutcome};
use agromind::gateway::HttpGateway;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "agromind")]
#[command(version)]
#[command(about = "Terminal chat client for the AgroMind agriculture assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides config and AGROMIND_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the reply
    Ask {
        query: String,

        /// Print the whole conversation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

enum LogTarget {
    File(PathBuf),
    Stderr,
}

fn init_tracing(cli: &Cli, target: LogTarget) -> Result<()> {
    let default_filter = if cli.verbose {
        "trace"
    } else if cli.debug {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match target {
        LogTarget::File(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    Ok(())
}

async fn ask(config: &Config, query: &str, json: bool) -> Result<ExitCode> {
    let gateway = HttpGateway::new(&config.backend)?;
    let controller = ConversationController::new(gateway);

    let outcome = controller.submit(query).await;
    if let SubmitOutcome::Rejected(Rejection::Empty) = outcome {
        bail!("Query is empty");
    }

    let snapshot = controller.snapshot();
    if json {
        let rendered = serde_json::to_string_pretty(&snapshot.messages)
            .context("Failed to serialize conversation")?;
        println!("{rendered}");
    } else if let Some(reply) = snapshot.messages.iter().rev().find(|m| !m.is_user()) {
        println!("{}", reply.display_text());
    }

    Ok(match outcome {
        SubmitOutcome::Answered => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn print_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("# {}", config.config_path().display());
    print!("{rendered}");
    Ok(())
}

/// Effective configuration: file, then environment, then flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_backend_url(cli.backend_url.clone());
    config.apply_timeout(cli.timeout);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            let config = load_config(&cli)?;
            let template = config.write_template_if_missing();
            init_tracing(&cli, LogTarget::File(config.log_path()))?;
            match template {
                Ok(true) => {
                    tracing::info!(path = %config.config_path().display(), "wrote default config");
                }
                Ok(false) => {}
                Err(err) => tracing::warn!(error = %err, "could not write default config"),
            }

            agromind::app::run_tui(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Ask { query, json }) => {
            init_tracing(&cli, LogTarget::Stderr)?;
            let config = load_config(&cli)?;
            ask(&config, query, *json).await
        }
        Some(Commands::Config) => {
            init_tracing(&cli, LogTarget::Stderr)?;
            print_config(&load_config(&cli)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
