//! Tracing subscriber setup for the binary.
//!
//! Stderr always receives human-readable output. When a log directory is
//! configured, a daily-rolling file is written as well, optionally as JSON
//! lines. `RUST_LOG` overrides the default level.

use crate::config::LoggingConfig;
use crate::{RecoveryError, RecoveryResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// File name prefix for rolling log files
pub const LOG_FILE_PREFIX: &str = "mirror-heal.log";

/// Filter used when `RUST_LOG` is unset
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

pub fn build_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug)))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the life of the process. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, debug: bool) -> RecoveryResult<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = if config.json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(build_filter(debug))
        .with(stderr_layer)
        .try_init()
        .map_err(|e| RecoveryError::Config(format!("failed to initialise logging: {}", e)))?;

    Ok(guard)
}
