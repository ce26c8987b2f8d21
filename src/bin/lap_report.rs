//! lap_report - Summarise an existing lap log
//!
//! Reads a log written by `lapd`, collapses repeated sightings of the same
//! code into single line crossings, and prints lap times per code.
//! The log file is only read, never modified.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use lap_logger::report::{build_report, debounce_from_secs, DEFAULT_DEBOUNCE_SECS};
use lap_logger::read_log;

#[derive(Parser, Debug)]
#[command(name = "lap_report", about = "Print lap times from a QR lap log")]
struct Args {
    /// Lap log file to read.
    #[arg(value_name = "LOG_FILE", env = "LAPLOG_FILE")]
    log_file: PathBuf,

    /// Sightings of a code closer together than this count as one crossing.
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_SECS)]
    debounce_secs: i64,

    /// Only report this code.
    #[arg(long, value_name = "PAYLOAD")]
    code: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let debounce = debounce_from_secs(args.debounce_secs).context("--debounce-secs")?;

    let entries = read_log(&args.log_file)?;
    log::info!(
        "read {} entries from {}",
        entries.len(),
        args.log_file.display()
    );

    let mut report = build_report(&entries, debounce);
    if let Some(code) = args.code.as_deref() {
        if !report.retain_code(code) {
            return Err(anyhow!("code '{}' not found in {}", code, args.log_file.display()));
        }
    }

    println!("lap_report: {}", args.log_file.display());
    print!("{}", report);
    Ok(())
}
