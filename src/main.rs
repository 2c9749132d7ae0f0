use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

mod audio;
mod config;
mod discovery;
mod display;
mod ipc;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "wavestrip")]
#[command(
    author,
    version,
    about = "Mirrored bar-spectrum strip that follows whichever media player is audible"
)]
pub struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a default config file to ~/.config/wavestrip/config.toml and exit
    #[arg(long)]
    init_config: bool,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Strip width in terminal columns
    #[arg(short = 'w', long)]
    strip_width: Option<u16>,

    /// Sink to monitor (default sink when omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Keep the strip visible while nothing is playing
    #[arg(long)]
    always_show: bool,

    /// Log file (default: ~/.cache/wavestrip/wavestrip.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Send a command to a running instance (reset, show, hide, toggle, status, ping)
    #[arg(long, value_name = "COMMAND")]
    send: Option<String>,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wavestrip")
        .join("wavestrip.log")
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file: File = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wavestrip=info".parse()?),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "wavestrip", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(ref line) = args.send {
        let response = ipc::send_command(line).await?;
        println!("{}", response);
        return Ok(());
    }

    if args.init_config {
        let path = Config::init_default_config()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&log_path)?;

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_path().unwrap_or_default(),
    };
    config.merge_args(&args);

    info!(
        "Starting wavestrip {} ({} columns, {} fps)",
        env!("CARGO_PKG_VERSION"),
        config.display.strip_width,
        config.display.fps
    );

    display::terminal::run(config).await
}
