use once_cell::sync::OnceCell;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console logging to stderr, so stdout stays clean for the tables.
pub fn init_logger() {
    LOGGER_INIT.get_or_init(|| {
        fmt()
            .with_env_filter(env_filter())
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();

        tracing::debug!("logger initialized");
    });
}

/// File logging for the TUI, which owns the terminal while it runs.
pub fn init_file_logger(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    LOGGER_INIT.get_or_init(|| {
        fmt()
            .with_env_filter(env_filter())
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();

        tracing::info!(log = ?path, "logger initialized");
    });
    Ok(())
}
