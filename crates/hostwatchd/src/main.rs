//! hostwatchd: the hostwatch daemon.
//!
//! Reads observation events as JSON lines on stdin and feeds them into the
//! monitor engine, with the purge task running alongside.
//!
//! # Usage
//!
//! ```text
//! sampler | hostwatchd run --config /etc/hostwatch.toml --data-dir /var/lib/hostwatch
//! hostwatchd show --data-dir /var/lib/hostwatch
//! ```

mod ingest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hostwatch_monitor::{
    CachingStore, ErrorHandlingStore, LogNotifier, MonitorConfig, MonitorEngine, ResponseFileSink,
    spawn_purge_task,
};
use hostwatch_state::StatusDb;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::ingest::Ingestor;

const DB_FILE: &str = "hostwatch.redb";

#[derive(Parser)]
#[command(name = "hostwatchd", about = "hostwatch daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor observations read from stdin.
    Run {
        /// Path to hostwatch.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/hostwatch")]
        data_dir: PathBuf,
    },
    /// Print persisted host statuses as JSON lines.
    Show {
        #[arg(long, default_value = "/var/lib/hostwatch")]
        data_dir: PathBuf,
    },
    /// Print the default configuration.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hostwatch=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, data_dir } => run(config.as_deref(), &data_dir).await,
        Command::Show { data_dir } => show(&data_dir),
        Command::DefaultConfig => {
            print!("{}", MonitorConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MonitorConfig> {
    match path {
        Some(path) => {
            let config = MonitorConfig::from_file(path)?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(MonitorConfig::default()),
    }
}

/// Open the on-disk database, or an in-memory one if that fails.
fn open_state(data_dir: &Path) -> anyhow::Result<StatusDb> {
    let db_path = data_dir.join(DB_FILE);
    let opened = std::fs::create_dir_all(data_dir)
        .map_err(anyhow::Error::from)
        .and_then(|_| StatusDb::open(&db_path).map_err(anyhow::Error::from));

    match opened {
        Ok(db) => {
            info!(path = %db_path.display(), "state store opened");
            Ok(db)
        }
        Err(e) => {
            warn!(
                path = %db_path.display(),
                error = %e,
                "failed to open state store, falling back to memory"
            );
            Ok(StatusDb::open_in_memory()?)
        }
    }
}

async fn run(config_path: Option<&Path>, data_dir: &Path) -> anyhow::Result<()> {
    info!("hostwatch daemon starting");

    let config = load_config(config_path)?;
    let db = open_state(data_dir)?;

    let store = Arc::new(ErrorHandlingStore::new(CachingStore::new(Arc::new(db))));

    let mut engine = MonitorEngine::new(
        store.clone(),
        config.monitor.clone(),
        config.notify.clone(),
        Arc::new(LogNotifier),
    );
    if let Some(dir) = &config.storage.artifact_dir {
        std::fs::create_dir_all(dir)?;
        engine = engine.with_artifact_sink(Arc::new(ResponseFileSink::new(dir)));
        info!(dir = %dir.display(), "failed responses will be saved");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let purge_handle = spawn_purge_task(store, config.retention.clone(), shutdown_rx);

    let mut ingestor = Ingestor::new(engine);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => ingestor.handle_line(&line),
                None => {
                    info!("end of input");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = purge_handle.await;

    let stats = ingestor.stats();
    info!(
        samples = stats.samples,
        notifications = stats.notifications,
        iterations = stats.iterations,
        rejected = stats.rejected,
        "hostwatch daemon stopped"
    );
    Ok(())
}

fn show(data_dir: &Path) -> anyhow::Result<()> {
    let db_path = data_dir.join(DB_FILE);
    if !db_path.exists() {
        anyhow::bail!("no state store at {}", db_path.display());
    }
    let db = StatusDb::open(&db_path)?;
    for status in db.list_host_statuses()? {
        println!("{}", serde_json::to_string(&status)?);
    }
    Ok(())
}
