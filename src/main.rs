use std::{path::PathBuf, process, time::Duration};

use clap::Parser;
use editor_plugin::{
    config::{LogLevel, PluginConfig, ReadMode},
    logging::init_file_logging,
    run_stdio,
};
use indentation_plugin::{ENV_PREFIX, IndentationPlugin, LOG_FILE_NAME};
use tracing::{debug, error, info};

/// Flags override `INDENTATION_*` environment variables, which override the
/// defaults. The editor starts the plugin without any of them.
#[derive(Parser, Debug)]
#[command(
    name = "indentation",
    about = "Re-Indent plugin, speaks the editor's line protocol on stdin / stdout",
    version
)]
struct Cli {
    /// How to wait for editor input: `blocking` or `poll`
    #[arg(long)]
    read_mode: Option<ReadMode>,

    /// Sleep between batches in poll mode, in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: Option<u64>,

    /// Write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, critical)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// The editor always passes the descriptor's `Arguments` value, even when
    /// it is empty.
    #[arg(hide = true)]
    host_arguments: Vec<String>,
}

impl Cli {
    fn apply(&self, mut config: PluginConfig) -> PluginConfig {
        if let Some(mode) = self.read_mode {
            config.read_mode = mode;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.apply(PluginConfig::from_env(ENV_PREFIX)?);

    if let Some(dir) = &config.log_dir {
        init_file_logging(dir, LOG_FILE_NAME, config.log_level)?;
    }
    info!(?config, "indentation plugin starting");
    debug!(arguments = ?cli.host_arguments, "host arguments");

    // exit right away: a pending stdin read would otherwise hold up runtime shutdown
    if let Err(e) = run_stdio(IndentationPlugin, &config).await {
        error!("indentation plugin stopped: {e}");
        eprintln!("indentation plugin stopped: {e}");
        process::exit(1);
    }

    info!("indentation plugin exiting");
    Ok(())
}
