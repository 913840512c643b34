//! mailwatch - filesystem change notifications by email.
//!
//! This binary watches configured directory subtrees and mails a templated
//! notification for every matching change event.
//!
//! # Commands
//!
//! - `mailwatch run <config>`: Start the watch loop in the foreground
//! - `mailwatch check <config>`: Validate the configuration and exit
//!
//! The process runs in the foreground; backgrounding is the service
//! manager's job. `--pid-file` writes the process id for supervisors that
//! want one.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mailwatch::config::Config;
use mailwatch::dispatch::EventDispatcher;
use mailwatch::mailer::SmtpMailer;
use mailwatch::registry::RuleRegistry;
use mailwatch::watcher::{DirWatcher, FsEvent};

/// mailwatch - filesystem change notifications by email.
///
/// Watches configured directory subtrees for change events and sends a
/// notification email for every event that matches a watch rule.
#[derive(Parser, Debug)]
#[command(name = "mailwatch")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
CONFIGURATION:
    One [watch.<name>] table per rule; see the config module documentation
    for the full format. SMTP credentials are read from the SMTP_USERNAME
    and SMTP_PASSWORD environment variables when both are set.

EXAMPLES:
    # Validate a configuration
    mailwatch check /etc/mailwatch.toml

    # Run with per-event diagnostics
    mailwatch -v run /etc/mailwatch.toml

    # Run under a supervisor that expects a PID file
    mailwatch run /etc/mailwatch.toml --pid-file /run/mailwatch.pid
")]
struct Cli {
    /// Enable debug-level diagnostics, including a per-event trace.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the watch loop in the foreground.
    Run {
        /// Path to the configuration file.
        config: PathBuf,

        /// Write the process id to this file on startup, remove it on
        /// shutdown.
        #[arg(long)]
        pid_file: Option<PathBuf>,
    },

    /// Load and validate a configuration, then exit.
    Check {
        /// Path to the configuration file.
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Check { config } => run_check(&config),
        Command::Run { config, pid_file } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_watch(&config, pid_file.as_deref()))
        }
    }
}

/// Initializes the logging subsystem.
///
/// `--verbose` lowers the default level to debug; `RUST_LOG` still wins when
/// set and verbose is off.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Validates a configuration file and prints a per-rule summary.
fn run_check(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path).context("Configuration is invalid")?;
    let registry = RuleRegistry::from_rules(config.rules).context("Watch paths overlap")?;

    println!("{}: OK", config_path.display());
    println!(
        "smtp: {}:{} (tls: {})",
        config.smtp.host,
        config.smtp.port.unwrap_or(25),
        config.smtp.tls
    );
    for rule in registry.iter() {
        println!(
            "watch '{}': {}{} -> {}",
            rule.name,
            rule.path.display(),
            if rule.recursive { " (recursive)" } else { "" },
            rule.mail_to
        );
    }

    Ok(())
}

/// Runs the watch loop until a shutdown signal arrives.
async fn run_watch(config_path: &Path, pid_file: Option<&Path>) -> Result<()> {
    info!("Starting mailwatch");

    let config = Config::load(config_path).context("Failed to load configuration")?;

    info!(
        config = %config_path.display(),
        rules = config.rules.len(),
        smtp_host = %config.smtp.host,
        "Configuration loaded"
    );

    let registry =
        RuleRegistry::from_rules(config.rules).context("Failed to build rule registry")?;

    let mailer = SmtpMailer::from_config(&config.smtp.host, config.smtp.port, config.smtp.tls)
        .context("Failed to set up SMTP transport")?;

    let (tx, mut rx) = mpsc::channel::<FsEvent>(config.channel_capacity);

    let _watcher = DirWatcher::new(registry.iter(), tx)
        .context("Failed to register filesystem watches")?;

    info!(rules = registry.len(), "Filesystem watches registered");

    if let Some(path) = pid_file {
        fs::write(path, format!("{}\n", std::process::id()))
            .with_context(|| format!("Failed to write PID file {}", path.display()))?;
        info!(pid_file = %path.display(), "PID file written");
    }

    let dispatcher = EventDispatcher::new(registry, mailer);

    info!("mailwatch running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = wait_for_shutdown() => {
                info!("Shutdown signal received");
                break;
            }

            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        // Per-event errors are logged and do not stop the
                        // loop; one failed notification must not halt
                        // monitoring of other rules.
                        if let Err(e) = dispatcher.handle(&event).await {
                            error!(
                                error = %e,
                                path = %event.pathname.display(),
                                "event dispatch failed"
                            );
                        }
                    }
                    None => {
                        error!("event channel closed unexpectedly");
                        break;
                    }
                }
            }
        }
    }

    if let Some(path) = pid_file {
        if let Err(e) = fs::remove_file(path) {
            warn!(pid_file = %path.display(), error = %e, "Failed to remove PID file");
        }
    }

    info!("mailwatch stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
