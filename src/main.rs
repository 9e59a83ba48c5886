//! chat-orchestrator command line.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    ORCHESTRATOR                       │
//!                      │                                                       │
//!   query, session     │  ┌────────────┐    ┌────────────┐    ┌─────────────┐  │
//!   ───────────────────┼─▶│ classifier │───▶│ confidence │───▶│ structured  │  │
//!                      │  │ (breaker)  │    │   router   │    │  templates  │  │
//!                      │  └────────────┘    └─────┬──────┘    └──────┬──────┘  │
//!                      │                          │                  │ fails   │
//!                      │                          ▼                  ▼         │
//!                      │                   ┌──────────────┐   ┌────────────┐   │
//!                      │                   │   fallback   │──▶│   search   │   │
//!                      │                   │    chain     │   │ (breaker)  │   │
//!                      │                   │ breaker+retry│   └─────┬──────┘   │
//!                      │                   └──────┬───────┘         │ fails    │
//!   FinalResponse      │  ┌────────────┐          │                 ▼          │
//!   ◀──────────────────┼──│ assembler  │◀─────────┴────────── canned floor      │
//!                      │  └────────────┘                                       │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_orchestrator::config::loader::{apply_overrides, load_config, ConfigError};
use chat_orchestrator::config::watcher::ConfigWatcher;
use chat_orchestrator::config::OrchestratorConfig;
use chat_orchestrator::lifecycle::{build_orchestrator, signals, Shutdown};
use chat_orchestrator::observability::{logging, metrics};
use chat_orchestrator::{ChatSession, Orchestrator};

#[derive(Parser)]
#[command(name = "chat-orchestrator", version)]
#[command(about = "Resilient routing between classifier, generative providers and search", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "CHAT_ORCHESTRATOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one query and print the response as JSON
    Ask {
        query: String,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, default_value = "cli")]
        session: String,
    },
    /// Interactive chat session with config hot reload
    Repl {
        #[arg(long, default_value = "en")]
        language: String,
    },
    /// Load and validate the configuration, reporting every problem
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::CheckConfig = cli.command {
        return check_config(cli.config.as_deref());
    }

    let config = read_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        providers = config.providers.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "chat-orchestrator starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let orchestrator = build_orchestrator(&config)?;

    match cli.command {
        Commands::Ask {
            query,
            language,
            session,
        } => {
            let session = ChatSession::new(session, language);
            let response = orchestrator.respond(&query, &session).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Repl { language } => {
            repl(
                orchestrator,
                &config,
                cli.config.as_deref(),
                ChatSession::new(uuid::Uuid::new_v4().to_string(), language),
            )
            .await?;
        }
        Commands::CheckConfig => {}
    }

    Ok(())
}

fn read_config(path: Option<&Path>) -> Result<OrchestratorConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = OrchestratorConfig::default();
            apply_overrides(&mut config, |key| std::env::var(key).ok())?;
            Ok(config)
        }
    }
}

fn check_config(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match read_config(path) {
        Ok(config) => {
            println!(
                "Configuration OK: {} provider(s), classifier {}, search {}",
                config.providers.len(),
                configured(&config.services.classifier_url),
                configured(&config.services.search_url),
            );
            Ok(())
        }
        Err(ConfigError::Validation(errors)) => {
            eprintln!("Configuration has {} problem(s):", errors.len());
            for error in &errors {
                eprintln!("  - {error}");
            }
            Err(ConfigError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn configured(url: &Option<String>) -> &'static str {
    if url.is_some() {
        "configured"
    } else {
        "disabled"
    }
}

async fn repl(
    orchestrator: Orchestrator,
    config: &OrchestratorConfig,
    config_path: Option<&Path>,
    mut session: ChatSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    let mut shutdown_rx = shutdown.subscribe();
    signals::spawn_ctrl_c_handler(shutdown.clone());

    // The watcher stops delivering when dropped.
    let (_watcher, mut reloads) = match config_path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(rx))
        }
        None => (None, None),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type a question, :breakers for circuit state, :quit to exit.");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            Some(new_config) = next_reload(&mut reloads) => {
                if let Err(errors) = orchestrator.apply_routing(&new_config.routing) {
                    for error in errors {
                        tracing::error!(%error, "Rejected routing reload");
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                match line {
                    "" => continue,
                    ":quit" | ":q" => break,
                    ":breakers" => {
                        println!("{}", serde_json::to_string_pretty(&orchestrator.breaker_snapshot())?);
                    }
                    query => {
                        let response = orchestrator.respond(query, &session).await;
                        println!("{}", response.text);
                        eprintln!(
                            "[{} via {}{}]",
                            response.route.map_or("rejected", |r| r.as_str()),
                            response.provider_used,
                            response
                                .fallback_reason
                                .map(|r| format!(", {r}"))
                                .unwrap_or_default(),
                        );
                        session.record_exchange(query, &response.text, config.response.max_history_turns);
                    }
                }
            }
        }
    }

    tracing::info!("Session ended");
    Ok(())
}

/// Next reloaded config, or pending forever when hot reload is off.
async fn next_reload(
    reloads: &mut Option<tokio::sync::mpsc::UnboundedReceiver<OrchestratorConfig>>,
) -> Option<OrchestratorConfig> {
    match reloads {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
