//! Tracing setup: console on stderr plus a daily-rolling file under
//! `<data_dir>/logs`.

use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "outreach.log";

/// Install the global subscriber. Keep the returned guard alive for the whole
/// process or buffered file lines are lost.
pub fn init_logging(level: &str, data_dir: &Path) -> Result<WorkerGuard> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer));

    tracing::subscriber::set_global_default(subscriber)?;
    // Route `log` records from dependencies into tracing
    tracing_log::LogTracer::init()?;

    Ok(guard)
}
