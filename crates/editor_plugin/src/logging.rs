//! File based tracing for plugin processes.
//!
//! stdout belongs to the host protocol, so log events can only ever go to a
//! file. Nothing is installed when no log directory is configured.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing::{Dispatch, dispatcher};
use tracing_appender::rolling::daily;
use tracing_subscriber::{Layer, Registry, fmt, prelude::*};

use crate::{config::LogLevel, error::PluginError};

static INSTALLED: OnceLock<PathBuf> = OnceLock::new();

/// A subscriber writing plain text to a daily rolling file in `log_dir`.
/// `file_name` is the prefix of the dated file names.
pub fn file_dispatch(log_dir: &Path, file_name: &str, level: LogLevel) -> Dispatch {
    let appender = daily(log_dir, file_name);
    Dispatch::new(
        Registry::default().with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(appender)
                .with_filter(level.to_level_filter()),
        ),
    )
}

/// Installs the file subscriber as the global default. Calling it again after
/// a successful install is a no-op.
pub fn init_file_logging(log_dir: &Path, file_name: &str, level: LogLevel) -> Result<(), PluginError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    fs::create_dir_all(log_dir)
        .map_err(|e| PluginError::Logging(format!("cannot create log dir {}: {e}", log_dir.display())))?;

    dispatcher::set_global_default(file_dispatch(log_dir, file_name, level))
        .map_err(|e| PluginError::Logging(e.to_string()))?;

    let _ = INSTALLED.set(log_dir.to_path_buf());
    Ok(())
}
