//! lapd - QR lap logging daemon
//!
//! This daemon:
//! 1. Opens the lap log for append (fatal if not writable)
//! 2. Captures a still from the camera endpoint
//! 3. Decodes QR codes in the frame
//! 4. Appends one timestamped line per decoded code
//! 5. Sleeps for the poll interval and repeats until Ctrl-C

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use lap_logger::config::LapLoggerConfig;
use lap_logger::{open_source, CancelToken, LapLog, LapLogger, QrCodeReader};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Poll a camera snapshot endpoint and log QR-coded laps"
)]
struct Args {
    /// Lap log file (appended to, never truncated).
    #[arg(value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Camera endpoint: http(s) snapshot/MJPEG URL, file:// URL, or local image path.
    #[arg(value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// Optional JSON config file.
    #[arg(long, env = "LAPLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Pause between polls in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// HTTP capture timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = LapLoggerConfig::load(args.config.as_deref())?;
    cfg.apply_overrides(
        args.log_file,
        args.endpoint,
        args.interval_ms,
        args.timeout_secs,
    );
    cfg.validate()?;

    let source = open_source(&cfg.endpoint, cfg.capture_timeout)?;
    let log = LapLog::open(&cfg.log_path)?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("install Ctrl-C handler")?;

    log::info!("writing laps to {}", cfg.log_path.display());
    log::info!("press Ctrl-C to stop");

    let stats = LapLogger::new(source, QrCodeReader::new(), log, cfg.logger_settings())
        .with_cancel_token(cancel)
        .run();
    log::debug!("final stats: {:?}", stats);
    Ok(())
}
