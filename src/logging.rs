use std::path::Path;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{prelude::*, util::SubscriberInitExt};

use crate::errors::AppError;

const LOG_FILE_MAX_BYTES: u64 = 1024 * 1024 * 5;
const LOG_FILE_KEEP: usize = 2;

/// Sets up console logging, plus a rotating log file when `log_file` is given.
///
/// `RUST_LOG` overrides the console level. The returned guard must be held
/// until exit so buffered file logs get flushed.
pub fn init(
    verbose: bool,
    color: bool,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, AppError> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},hyper=info,h2=info")));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(color)
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_owned()))
        .with_filter(env_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let appender = BasicRollingFileAppender::new(
                path,
                RollingConditionBasic::new().max_size(LOG_FILE_MAX_BYTES),
                LOG_FILE_KEEP,
            )?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.6f".to_owned()))
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
