use std::{path::Path, process::Stdio, time::Duration};

use anyhow::Result;
use tempfile::{TempDir, tempdir};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    time::timeout,
};

const STARTED: &[u8] = b"#Indentation plugin started\n";
const MENU: &[u8] =
    b"AddMenuItem,menu_Edit(&Edit)\\editActionReIndent(Re-Indent),after#editActionUnindent,Ctrl+Alt+I\n";
const WAIT: Duration = Duration::from_secs(10);
const PLUGIN_VARS: [&str; 4] =
    ["INDENTATION_READ_MODE", "INDENTATION_POLL_INTERVAL_MS", "INDENTATION_LOG_DIR", "INDENTATION_LOG_LEVEL"];

/// The plugin started the way the editor does: piped stdin / stdout, working
/// directory set to the plugin folder, one (empty) argument.
fn plugin_command(workdir: &Path, envs: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_indentation"));
    cmd.arg("")
        .current_dir(workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    for key in PLUGIN_VARS {
        cmd.env_remove(key);
    }
    cmd.envs(envs.iter().copied());
    cmd
}

fn spawn_plugin(workdir: &Path, envs: &[(&str, &str)]) -> Result<(Child, ChildStdin, BufReader<ChildStdout>)> {
    let mut child = plugin_command(workdir, envs).spawn()?;
    let stdin = child.stdin.take().expect("piped stdin");
    let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
    Ok((child, stdin, stdout))
}

async fn read_line(out: &mut BufReader<ChildStdout>) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    timeout(WAIT, out.read_until(b'\n', &mut line)).await??;
    Ok(line)
}

async fn finish(mut child: Child, stdin: ChildStdin, mut out: BufReader<ChildStdout>) -> Result<(Vec<u8>, bool)> {
    drop(stdin);
    let mut rest = Vec::new();
    timeout(WAIT, out.read_to_end(&mut rest)).await??;
    let status = timeout(WAIT, child.wait()).await??;
    Ok((rest, status.success()))
}

fn workdir() -> Result<TempDir> {
    Ok(tempdir()?)
}

#[tokio::test]
async fn registers_then_echoes_foo_and_bar() -> Result<()> {
    let dir = workdir()?;
    let (child, mut stdin, mut out) = spawn_plugin(dir.path(), &[])?;

    stdin.write_all(b"foo\nbar\n").await?;

    assert_eq!(read_line(&mut out).await?, STARTED);
    assert_eq!(read_line(&mut out).await?, MENU);
    assert_eq!(read_line(&mut out).await?, b"foo\n");
    assert_eq!(read_line(&mut out).await?, b"bar\n");

    let (rest, success) = finish(child, stdin, out).await?;
    assert!(rest.is_empty(), "unexpected trailing output: {rest:?}");
    assert!(success, "plugin should exit cleanly when stdin closes");
    Ok(())
}

#[tokio::test]
async fn each_line_is_visible_before_the_next_is_sent() -> Result<()> {
    let dir = workdir()?;
    let (child, mut stdin, mut out) = spawn_plugin(dir.path(), &[])?;
    read_line(&mut out).await?;
    read_line(&mut out).await?;

    for n in 0..5 {
        let line = format!("line {n}\n");
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        assert_eq!(read_line(&mut out).await?, line.as_bytes());
    }

    let (rest, success) = finish(child, stdin, out).await?;
    assert!(rest.is_empty());
    assert!(success);
    Ok(())
}

#[tokio::test]
async fn binary_input_round_trips_through_the_process() -> Result<()> {
    let payload: &[u8] = &[0x00, 0xff, b'\t', 0x80, b'\r', b'\n', 0xde, 0xad, b'\n', b'e', b'n', b'd'];
    let dir = workdir()?;
    let (child, mut stdin, mut out) = spawn_plugin(dir.path(), &[])?;
    read_line(&mut out).await?;
    read_line(&mut out).await?;

    stdin.write_all(payload).await?;
    let (rest, success) = finish(child, stdin, out).await?;
    assert_eq!(rest, payload);
    assert!(success);
    Ok(())
}

#[tokio::test]
async fn poll_mode_from_the_environment() -> Result<()> {
    let dir = workdir()?;
    let (child, mut stdin, mut out) =
        spawn_plugin(dir.path(), &[("INDENTATION_READ_MODE", "poll"), ("INDENTATION_POLL_INTERVAL_MS", "50")])?;

    assert_eq!(read_line(&mut out).await?, STARTED);
    assert_eq!(read_line(&mut out).await?, MENU);
    stdin.write_all(b"foo\nbar\n").await?;

    let (rest, success) = finish(child, stdin, out).await?;
    assert_eq!(rest, b"foo\nbar\n");
    assert!(success);
    Ok(())
}

#[tokio::test]
async fn dotenv_in_the_plugin_folder_enables_file_logging() -> Result<()> {
    let dir = workdir()?;
    let logs = dir.path().join("logs");
    std::fs::write(
        dir.path().join(".env"),
        format!("INDENTATION_LOG_DIR={}\nINDENTATION_LOG_LEVEL=debug\n", logs.display()),
    )?;

    let (child, mut stdin, mut out) = spawn_plugin(dir.path(), &[])?;
    stdin.write_all(b"hello\n").await?;
    assert_eq!(read_line(&mut out).await?, STARTED);
    assert_eq!(read_line(&mut out).await?, MENU);
    assert_eq!(read_line(&mut out).await?, b"hello\n");

    let (rest, success) = finish(child, stdin, out).await?;
    assert!(rest.is_empty(), "logs must never reach stdout: {rest:?}");
    assert!(success);

    let log_text: String = std::fs::read_dir(&logs)?
        .filter_map(|entry| entry.ok())
        .map(|entry| std::fs::read_to_string(entry.path()).unwrap_or_default())
        .collect();
    assert!(log_text.contains("indentation plugin starting"), "log was: {log_text}");
    assert!(log_text.contains("relayed line"));
    Ok(())
}

#[tokio::test]
async fn closed_stdout_exits_1_and_reports_on_stderr() -> Result<()> {
    let dir = workdir()?;
    let mut child = plugin_command(dir.path(), &[]).stderr(Stdio::piped()).spawn()?;
    let mut stdin = child.stdin.take().expect("piped stdin");
    let mut stderr = child.stderr.take().expect("piped stderr");
    // the editor went away: nobody reads the plugin's output any more
    drop(child.stdout.take());

    // the plugin may already have exited, in which case this write fails too
    let _ = stdin.write_all(b"foo\n").await;
    drop(stdin);

    let mut message = String::new();
    timeout(WAIT, stderr.read_to_string(&mut message)).await??;
    let status = timeout(WAIT, child.wait()).await??;

    assert_eq!(status.code(), Some(1), "stderr was: {message}");
    assert!(message.contains("indentation plugin stopped: I/O error"), "stderr was: {message}");
    Ok(())
}
