//! Logging initialization using the `tracing` ecosystem.
//!
//! - Console output (colored, human-readable)
//! - Optional file output (daily rotation via `tracing-appender`), either
//!   plain text or JSON lines for log shippers
//! - Configurable log level via env var `RUST_LOG` or explicit parameter

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber.
///
/// Should be called once at program start. `log_level` is the default when
/// `RUST_LOG` is not set. `log_dir` overrides `config.log_dir`.
pub fn init_logging(log_level: &str, log_dir: Option<&str>, config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(true);

    let file_layer = log_dir.or(config.log_dir.as_deref()).map(|dir| {
        let file_appender = tracing_appender::rolling::daily(dir, &config.module_name);
        let layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true);
        if config.json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
