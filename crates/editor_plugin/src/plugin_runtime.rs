//! Wires a plugin's stdin / stdout to a user supplied [`PluginHandler`].
//!
//! The lifecycle is fixed:
//! 1. every [`HostCommand`] from [`PluginHandler::startup`] is written, in
//!    order, before any input is looked at,
//! 2. each input line is handed to [`PluginHandler::on_input`] and whatever it
//!    returns is written back,
//! 3. end of input ends the loop with `Ok(())`.
//!
//! All output goes through [`Unbuffered`], so the host sees each line as soon
//! as it is written. A read or write error ends the loop with
//! [`PluginError::Io`].
//!
//! Usage:
//! ```ignore
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PluginConfig::from_env("MY_PLUGIN")?;
//!     run_stdio(MyPlugin::default(), &config).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader},
    sync::mpsc::{self, Receiver, Sender, error::TryRecvError},
    time::sleep,
};
use tracing::{debug, info};

use crate::{
    config::{PluginConfig, ReadMode},
    error::PluginError,
    protocol::{HostCommand, ProtocolError},
    unbuffered::Unbuffered,
};

/// Lines the poll-mode reader may hold before it stops reading the host.
pub const LINE_BACKLOG: usize = 1024;

// -----------------------------------------------------------------------------
// PluginHandler trait – implement this in your plugin code
// -----------------------------------------------------------------------------

#[async_trait]
pub trait PluginHandler: Send + Sync + 'static {
    /// Short name used in log events.
    fn name(&self) -> &str;

    /// Commands announced to the host once, before the echo loop starts. An
    /// error stops the plugin before anything is written.
    fn startup(&self) -> Result<Vec<HostCommand>, ProtocolError>;

    /// Handles one raw input line, terminator included. The returned bytes are
    /// written back verbatim; `None` writes nothing. Echoes by default.
    async fn on_input(&mut self, line: Vec<u8>) -> Option<Vec<u8>> {
        Some(line)
    }
}

// -----------------------------------------------------------------------------
// Runtime
// -----------------------------------------------------------------------------

/// Runs `plugin` against the process stdin / stdout until stdin closes.
pub async fn run_stdio<P: PluginHandler>(plugin: P, config: &PluginConfig) -> Result<(), PluginError> {
    run(plugin, BufReader::new(io::stdin()), io::stdout(), config).await
}

/// Runs `plugin` against any reader / writer pair until `input` closes or a
/// write fails.
pub async fn run<P, R, W>(
    mut plugin: P,
    input: R,
    output: W,
    config: &PluginConfig,
) -> Result<(), PluginError>
where
    P: PluginHandler,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let mut out = Unbuffered::new(output);
    register(&plugin, &mut out).await?;

    info!(plugin = plugin.name(), mode = %config.read_mode, "echo loop starting");
    match config.read_mode {
        ReadMode::Blocking => echo_blocking(&mut plugin, input, &mut out).await?,
        ReadMode::Poll => echo_polling(&mut plugin, input, &mut out, config.poll_interval).await?,
    }
    info!(plugin = plugin.name(), "input closed, shutting down");
    Ok(())
}

/// Writes the plugin's startup commands, one line per write.
pub async fn register<P, W>(plugin: &P, out: &mut Unbuffered<W>) -> Result<(), PluginError>
where
    P: PluginHandler,
    W: AsyncWrite + Unpin,
{
    for command in plugin.startup()? {
        out.write(command.to_line().as_bytes()).await?;
        debug!(%command, "sent startup command");
    }
    Ok(())
}

async fn relay<P, W>(plugin: &mut P, out: &mut Unbuffered<W>, line: Vec<u8>) -> Result<(), PluginError>
where
    P: PluginHandler,
    W: AsyncWrite + Unpin,
{
    let bytes = line.len();
    if let Some(reply) = plugin.on_input(line).await {
        out.write(&reply).await?;
    }
    debug!(bytes, "relayed line");
    Ok(())
}

async fn echo_blocking<P, R, W>(plugin: &mut P, mut input: R, out: &mut Unbuffered<W>) -> Result<(), PluginError>
where
    P: PluginHandler,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let mut line = Vec::new();
        if input.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        relay(plugin, out, line).await?;
    }
}

/// Keeps the fixed cadence of the stock plugin: drain everything that has
/// arrived, write it, sleep `interval`, repeat.
///
/// Input is read by a separate task so a slow host never stalls the cadence.
/// It holds at most [`LINE_BACKLOG`] lines and is aborted when the loop ends.
async fn echo_polling<P, R, W>(
    plugin: &mut P,
    input: R,
    out: &mut Unbuffered<W>,
    interval: Duration,
) -> Result<(), PluginError>
where
    P: PluginHandler,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let (tx, rx) = mpsc::channel(LINE_BACKLOG);
    let reader = tokio::spawn(read_lines(input, tx));
    let result = drain_on_cadence(plugin, rx, out, interval).await;
    reader.abort();
    result
}

async fn read_lines<R>(mut input: R, tx: Sender<io::Result<Vec<u8>>>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut line = Vec::new();
        match input.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}

async fn drain_on_cadence<P, W>(
    plugin: &mut P,
    mut rx: Receiver<io::Result<Vec<u8>>>,
    out: &mut Unbuffered<W>,
    interval: Duration,
) -> Result<(), PluginError>
where
    P: PluginHandler,
    W: AsyncWrite + Unpin,
{
    loop {
        let mut batch = 0usize;
        loop {
            match rx.try_recv() {
                Ok(Ok(line)) => {
                    relay(plugin, out, line).await?;
                    batch += 1;
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(TryRecvError::Empty) => break,
                // everything sent before the reader hung up has been drained
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if batch > 0 {
            debug!(batch, "relayed batch");
        }
        sleep(interval).await;
    }
}
