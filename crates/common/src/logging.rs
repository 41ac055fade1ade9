//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. When a log file is
/// configured and can be opened, output goes there instead of stderr.
pub fn init_logging(config: &LoggingConfig) {
    use std::sync::Mutex;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_file = config.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Failed to open log file {}: {e}", path.display()))
            .ok()
    });

    match (config.json, log_file) {
        (true, Some(file)) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (true, None) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (false, Some(file)) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (false, None) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}
