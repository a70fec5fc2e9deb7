#![forbid(unsafe_code)]

//! `worker-intercom`: run one supervised worker session.
//!
//! Loads configuration, locates the project root, resolves the worker's
//! credential, then runs the worker with progress on stderr and input
//! requests answered through a terminal multi-select.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use worker_intercom::config::GlobalConfig;
use worker_intercom::discovery::{find_project_root, starting_directory};
use worker_intercom::interaction::handler::InteractiveHandler;
use worker_intercom::interaction::terminal::TerminalChooser;
use worker_intercom::secrets::{resolve_credential, CredentialPrompt, KeyringStore, TerminalPrompt};
use worker_intercom::sink::ProgressSink;
use worker_intercom::{AppError, Result, Supervisor};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "worker-intercom", about = "Supervise a worker over NDJSON stdio", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Directory (or file) to start project root discovery from.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Never prompt for a missing credential.
    #[arg(long)]
    no_prompt: bool,
}

/// Progress on stderr so it never mixes with anything piped from stdout.
#[derive(Debug, Default, Clone, Copy)]
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "session failed");
            eprintln!("Worker error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = GlobalConfig::load_from_path(&args.config)?;
    info!("configuration loaded");

    // ── Locate project root ─────────────────────────────
    let start = starting_directory(args.dir.as_deref())?;
    let root = find_project_root(&start, &config.discovery.root_markers).ok_or_else(|| {
        AppError::Discovery(format!(
            "no project root ({}) found above {}",
            config.discovery.root_markers.join(", "),
            start.display()
        ))
    })?;
    info!(root = %root.display(), "project root located");

    // ── Build session ───────────────────────────────────
    let mut supervisor = Supervisor::new(
        config.worker_spec(),
        root,
        InteractiveHandler::new(Arc::new(TerminalChooser))
            .with_timeout(config.interaction_timeout()),
    )
    .with_envs(config.worker.env.clone())
    .with_progress(Arc::new(ConsoleProgress));

    // ── Resolve credential ──────────────────────────────
    if let Some(credential) = &config.credential {
        let store = KeyringStore::new(&credential.service);
        let prompt = (credential.prompt && !args.no_prompt).then_some(TerminalPrompt);
        let value = resolve_credential(
            &store,
            &credential.name,
            prompt.as_ref().map(|p| p as &dyn CredentialPrompt),
        )
        .await?;

        if value.is_none() && credential.required {
            return Err(AppError::Secret(format!(
                "{} is required to run the worker",
                credential.name
            )));
        }
        supervisor = supervisor.with_credential(&credential.name, value);
    }

    // ── Run session ─────────────────────────────────────
    ConsoleProgress.report("🚀 Starting worker…");
    supervisor.run().await
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
