use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use wavestrip::session::SpectrumProvider;
use wavestrip::settings::SettingsStore;
use wavestrip::{Engine, Event};

use crate::display::NullSurface;

/// Commands sent from IPC server to render loop
#[derive(Debug)]
pub enum IpcCommand {
    Reset { reply: oneshot::Sender<String> },
    Show { reply: oneshot::Sender<String> },
    Hide { reply: oneshot::Sender<String> },
    Toggle { reply: oneshot::Sender<String> },
    Status { reply: oneshot::Sender<String> },
    Ping { reply: oneshot::Sender<String> },
}

/// Get the socket path for IPC
pub fn socket_path() -> PathBuf {
    match std::env::var("XDG_RUNTIME_DIR") {
        Ok(dir) => PathBuf::from(dir).join("wavestrip.sock"),
        Err(_) => PathBuf::from("/tmp/wavestrip.sock"),
    }
}

/// Parse a protocol line into an IpcCommand
fn parse_command(line: &str, reply: oneshot::Sender<String>) -> Result<IpcCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["reset"] => Ok(IpcCommand::Reset { reply }),
        ["show"] => Ok(IpcCommand::Show { reply }),
        ["hide"] => Ok(IpcCommand::Hide { reply }),
        ["toggle"] => Ok(IpcCommand::Toggle { reply }),
        ["status"] => Ok(IpcCommand::Status { reply }),
        ["ping"] => Ok(IpcCommand::Ping { reply }),
        _ => Err(anyhow::anyhow!("Unknown command: {}", line)),
    }
}

/// Process an IPC command against the engine owned by the render loop
pub fn process_ipc_command<P, S>(cmd: IpcCommand, engine: &mut Engine<P, S>)
where
    P: SpectrumProvider,
    S: SettingsStore,
{
    let mut surface = NullSurface;
    let (reply, response) = match cmd {
        IpcCommand::Reset { reply } => {
            engine.reset_to_defaults();
            (reply, "ok: reset".to_string())
        }
        IpcCommand::Show { reply } => {
            engine.dispatch(Event::Visibility(true), &mut surface);
            (reply, "ok: visible".to_string())
        }
        IpcCommand::Hide { reply } => {
            engine.dispatch(Event::Visibility(false), &mut surface);
            (reply, "ok: hidden".to_string())
        }
        IpcCommand::Toggle { reply } => {
            let visible = !engine.is_visible();
            engine.dispatch(Event::Visibility(visible), &mut surface);
            let state = if visible { "visible" } else { "hidden" };
            (reply, format!("ok: {}", state))
        }
        IpcCommand::Status { reply } => {
            let status = engine.status();
            let source = status
                .active_source
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string());
            let response = format!(
                "ok: state={} source={} degraded={} visible={} hue={:.1} bars={} sources={}",
                status.state,
                source,
                status.degraded,
                status.visible,
                status.hue_rotation,
                status.bar_count,
                status.tracked_sources,
            );
            (reply, response)
        }
        IpcCommand::Ping { reply } => (reply, "ok: pong".to_string()),
    };
    let _ = reply.send(response);
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, cmd_tx: mpsc::Sender<IpcCommand>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();
    buf_reader.read_line(&mut line).await?;
    let line = line.trim();

    if line.is_empty() {
        return Ok(());
    }

    let (reply_tx, reply_rx) = oneshot::channel();

    let command = match parse_command(line, reply_tx) {
        Ok(cmd) => cmd,
        Err(e) => {
            writer.write_all(format!("err: {}\n", e).as_bytes()).await?;
            return Ok(());
        }
    };

    cmd_tx
        .send(command)
        .await
        .map_err(|_| anyhow::anyhow!("Render loop has shut down"))?;

    let response = reply_rx
        .await
        .unwrap_or_else(|_| "err: internal error".to_string());

    writer.write_all(format!("{}\n", response).as_bytes()).await?;
    Ok(())
}

/// Bind the IPC socket, replacing a stale one from a previous run
pub fn bind() -> Result<UnixListener> {
    let path = socket_path();
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("Failed to bind IPC socket {}", path.display()))?;
    info!("IPC server listening on {}", path.display());
    Ok(listener)
}

/// Accept clients forever, forwarding their commands to the render loop
pub async fn serve(listener: UnixListener, cmd_tx: mpsc::Sender<IpcCommand>) -> Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        let cmd_tx = cmd_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, cmd_tx).await {
                debug!("IPC client error: {}", e);
            }
        });
    }
}

/// Remove the socket file on shutdown
pub fn cleanup() {
    let _ = std::fs::remove_file(socket_path());
}

/// Send a command to a running wavestrip instance (client mode)
pub async fn send_command(line: &str) -> Result<String> {
    let path = socket_path();

    let stream = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        UnixStream::connect(&path),
    )
    .await
    .context("Connection timed out")?
    .context("Could not connect to wavestrip. Is it running?")?;

    let (reader, mut writer) = stream.into_split();

    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.shutdown().await?;

    let mut buf_reader = BufReader::new(reader);
    let mut response = String::new();

    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        buf_reader.read_line(&mut response),
    )
    .await
    .context("Response timed out")?
    .context("Failed to read response")?;

    Ok(response.trim().to_string())
}
