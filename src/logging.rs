use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::project_dirs;
use crate::constants::constants;

/// Route tracing output to a daily-rolling file in the cache directory.
///
/// stdout belongs to the TUI or the headless report, so nothing is written
/// to the terminal. The level comes from `YTREACH_LOG` (default `info`).
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init() -> Option<WorkerGuard> {
  let dir = project_dirs()?.cache_dir().to_path_buf();
  std::fs::create_dir_all(&dir).ok()?;

  let appender = tracing_appender::rolling::daily(&dir, &constants().log_file_name);
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env("YTREACH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(false))
    .with(filter)
    .try_init()
    .ok()?;
  Some(guard)
}
