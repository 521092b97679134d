use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mcp_server::{
    AdmissionConfig, CommandAdmissionFilter, ConfigSources, DenyReason, FileConfig, McpServer,
    PathAuthorizer, PathOverrides, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "mcp-server", version)]
#[command(about = "MCP tool server with path and command admission control", long_about = None)]
struct Cli {
    /// Colon-separated list of allowed directories
    #[arg(long, global = true, value_name = "LIST")]
    paths: Option<String>,

    /// Colon-separated list of denied directories
    #[arg(long, global = true, value_name = "LIST")]
    deny_paths: Option<String>,

    /// TOML file with allowed_paths / denied_paths
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tools over stdio (default)
    Serve,
    /// Report whether each path is admitted
    CheckPath {
        #[arg(required = true, value_name = "PATH")]
        targets: Vec<String>,
    },
    /// Report whether each command token is admitted
    CheckCommand {
        #[arg(required = true, value_name = "TOKEN")]
        tokens: Vec<String>,
    },
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout belongs to the protocol
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AdmissionConfig> {
    let mut sources = ConfigSources::new();

    if let Some(path) = &cli.config {
        let file = FileConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        sources = sources.layer("file", PathOverrides::from_file(&file));
    }

    let sources = sources
        .layer("env", PathOverrides::from_env())
        .layer(
            "cli",
            PathOverrides::from_lists(cli.paths.as_deref(), cli.deny_paths.as_deref()),
        );

    let working_dir = std::env::current_dir().context("failed to read working directory")?;
    Ok(sources.build(working_dir))
}

fn log_config(config: &AdmissionConfig) {
    for rule in config.allowed() {
        info!(path = %rule.root().display(), "allowed path");
    }
    for rule in config.denied() {
        info!(path = %rule.root().display(), "denied path");
    }
}

async fn serve(paths: PathAuthorizer) -> Result<()> {
    let registry = ToolRegistry::with_default_tools(paths);
    info!(tools = ?registry.names(), "starting MCP server on stdio");
    let server = McpServer::new(registry);

    tokio::select! {
        result = server.serve_stdio() => result,
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Print one line per subject; returns true when every subject was admitted.
fn report<'a>(checks: impl IntoIterator<Item = (&'a str, Result<PathBuf, DenyReason>)>) -> bool {
    let mut all_allowed = true;
    for (subject, outcome) in checks {
        match outcome {
            Ok(resolved) => println!("allowed {}", resolved.display()),
            Err(reason) => {
                all_allowed = false;
                println!("denied {}: {}", subject, reason);
            }
        }
    }
    all_allowed
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    log_config(&config);
    let paths = PathAuthorizer::new(Arc::new(config));

    let ok = match &cli.command {
        None | Some(Commands::Serve) => {
            serve(paths).await.inspect_err(|e| error!(error = %e, "server failed"))?;
            true
        }
        Some(Commands::CheckPath { targets }) => {
            report(targets.iter().map(|t| (t.as_str(), paths.resolve(t))))
        }
        Some(Commands::CheckCommand { tokens }) => {
            let commands = CommandAdmissionFilter::new(paths);
            report(tokens.iter().map(|t| (t.as_str(), commands.resolve(t))))
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
