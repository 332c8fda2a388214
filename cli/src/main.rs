mod input;
mod play;
mod presenter;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::core::config::Settings;
use engine::core::storage::{HistoryStore, JsonFileStore, MemoryStore};
use engine::results::{record_line, HistoryState};
use engine::tasks::nback::ModalitySet;
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dualback")]
#[command(about = "Multi-modal n-back training in the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML); defaults to the platform config dir
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// History file path (overrides the platform data dir)
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a training session
    Play {
        /// N-back level (clamped to 1..=max level)
        #[arg(long, short = 'n')]
        level: Option<i32>,

        /// Comma separated, e.g. `position,audio,color`
        #[arg(long, short = 'm')]
        modalities: Option<ModalitySet>,

        /// Trials per session
        #[arg(long, short = 't')]
        trials: Option<usize>,

        /// Offer another session at the suggested level after each one
        #[arg(long = "continue")]
        keep_going: bool,
    },
    /// Show stored sessions, newest first
    History {
        /// Show at most this many sessions
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Delete every stored session
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if cli.debug {
        EnvFilter::new("engine=debug,dualback=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let result = runtime.block_on(run(cli));
    // Stdin reads park on a blocking thread that never returns on its own.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => {
            info!("Loading settings from: {:?}", path);
            Settings::load_from(path)
        }
        None => Settings::load(),
    }
    .context("invalid settings")?;

    let mut store = open_store(cli.history_file.clone());

    match cli.command {
        Commands::Play {
            level,
            modalities,
            trials,
            keep_going,
        } => {
            if let Some(level) = level {
                settings.session.n_level = settings.rules.clamp_level(level);
            }
            if let Some(modalities) = modalities {
                settings.session.modalities = modalities;
            }
            if let Some(trials) = trials {
                settings.session.total_trials = trials;
            }
            settings.validate().context("invalid session settings")?;
            play::play(settings, &mut *store, keep_going).await
        }
        Commands::History { limit } => {
            show_history(&*store, &settings, limit);
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes && !play::confirm("Delete all stored sessions? [y/N] ").await? {
                println!("Nothing deleted.");
                return Ok(());
            }
            store.clear_all().context("failed to clear history")?;
            println!("History cleared.");
            Ok(())
        }
    }
}

fn open_store(path: Option<PathBuf>) -> Box<dyn HistoryStore> {
    if let Some(path) = path {
        return Box::new(JsonFileStore::new(path));
    }
    match JsonFileStore::open_default() {
        Ok(store) => {
            tracing::debug!(path = ?store.path(), "using history file");
            Box::new(store)
        }
        Err(err) => {
            warn!(error = %err, "no history location; sessions will not be saved");
            Box::new(MemoryStore::new())
        }
    }
}

fn show_history(store: &dyn HistoryStore, settings: &Settings, limit: usize) {
    let history = HistoryState::load(store);
    if let Some(error) = &history.error {
        println!("{error}");
        return;
    }
    if history.records.is_empty() {
        println!("No sessions yet.");
        return;
    }

    if let Some(today) = history.today(OffsetDateTime::now_utc().date()) {
        println!(
            "Today: {} session(s), avg {}%, best {}-back",
            today.sessions, today.avg_accuracy, today.max_level
        );
        println!();
    }
    for record in history.records.iter().take(limit) {
        println!("{}", record_line(record, &settings.rules));
    }
}
