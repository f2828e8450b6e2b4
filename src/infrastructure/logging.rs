//! Logging initialization
//!
//! Console output filtered by the configured env-filter directive, with an
//! optional daily-rolling file appender. The non-blocking writer guard is
//! held in a process-wide slot so file logging stays alive for the life of
//! the process.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::infrastructure::config::{ConfigManager, LoggingSettings};

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const LOG_FILE_PREFIX: &str = "relist.log";

/// Initialize the global tracing subscriber from logging settings.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once fails; tests use their own subscribers.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("invalid log filter directive")?;

    let console = fmt::layer().with_target(true);

    if settings.file_output {
        let directory = match &settings.directory {
            Some(directory) => directory.clone(),
            None => ConfigManager::config_dir()?.join("logs"),
        };
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("cannot create log directory {}", directory.display()))?;

        let appender = tracing_appender::rolling::daily(&directory, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        FILE_GUARD
            .set(guard)
            .map_err(|_| anyhow::anyhow!("logging already initialized"))?;

        let file = fmt::layer().with_ansi(false).with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()
            .context("failed to install tracing subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
            .context("failed to install tracing subscriber")?;
    }

    tracing::info!(file_output = settings.file_output, "logging initialized");
    Ok(())
}
