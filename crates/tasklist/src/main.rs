//! CLI entry point for tasklist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tasklist_app::{APP_DIR, Backend, CONFIG_FILE, TasklistConfig};
use tasklist_core::CompletionFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;
mod render;
mod selector;
mod shell;

/// A small task list backed by a local snapshot or a realtime collection.
#[derive(Parser, Debug)]
#[command(name = "tasklist", version, about = "tasklist: add, complete and reorder tasks")]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend, overriding the configuration file.
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Directory of the local snapshot, overriding the configuration file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Mark a task as completed.
    Done { selector: String },

    /// Delete a task.
    Rm { selector: String },

    /// Move an active task up.
    Up { selector: String },

    /// Move an active task down.
    Down { selector: String },

    /// Print the task list.
    Ls {
        /// Case-insensitive text search.
        #[arg(short, long)]
        query: Option<String>,
        /// Completion filter: all, active or completed.
        #[arg(short, long)]
        filter: Option<CompletionFilter>,
        /// Expand the completed section.
        #[arg(short, long)]
        all: bool,
    },

    /// Interactive shell that re-renders on every change.
    Shell,
}

fn main() -> Result<()> {
    let Cli {
        config,
        backend,
        data_dir,
        cmd,
    } = Cli::parse();

    install_tracing();

    let mut settings = load_config(config)?;
    if let Some(backend) = backend {
        settings.storage.backend = backend;
    }
    if let Some(dir) = data_dir {
        settings.storage.dir = Some(dir);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(commands::run(cmd, &settings, &default_data_dir()))
}

fn load_config(path: Option<PathBuf>) -> Result<TasklistConfig> {
    match path.or_else(default_config_path) {
        Some(path) => TasklistConfig::load(path),
        None => Ok(TasklistConfig::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".tasklist"), |dir| dir.join(APP_DIR))
}

fn install_tracing() {
    // RUST_LOG overrides the default; stdout stays reserved for the list.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
