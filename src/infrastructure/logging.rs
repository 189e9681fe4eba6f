use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const COMMAND_LOG_FILE: &str = "commands.log";

pub fn init_logging(logs_dir: &Path) -> Result<WorkerGuard, InfraError> {
    fs::create_dir_all(logs_dir)?;
    let appender = tracing_appender::rolling::never(logs_dir, COMMAND_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .json()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed; keeping it");
    }
    Ok(guard)
}
