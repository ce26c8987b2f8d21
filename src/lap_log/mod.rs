//! Append-only lap log.
//!
//! One entry per line: `YYYY-MM-DD HH:MM:SS, <payload>`, UTC.
//!
//! The log is never truncated or rewritten. `LapLog` holds the file open for
//! the lifetime of a run and closes it on drop, so every exit path from the
//! loop releases the handle.

mod entry;

use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub use entry::{format_line, parse_line, DecodedPayload, LogEntry, TIMESTAMP_FORMAT};

/// Open append handle on a lap log file.
pub struct LapLog {
    path: PathBuf,
    file: File,
    appended: u64,
}

impl LapLog {
    /// Open `path` for appending, creating it if missing.
    ///
    /// Entries from earlier runs are preserved.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open lap log {} for append", path.display()))?;
        Ok(Self {
            path,
            file,
            appended: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries appended through this handle.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Append one entry and flush it to the file.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let mut line = format_line(entry);
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .with_context(|| format!("append to lap log {}", self.path.display()))?;
        self.appended += 1;
        Ok(())
    }
}

/// Read every entry from a lap log in file order.
///
/// Blank lines are skipped. A malformed line fails the whole read.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<LogEntry>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("open lap log {}", path.display()))?;
    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("read lap log {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_line(&line)
            .map_err(|e| anyhow!("{}:{}: {:#}", path.display(), index + 1, e))?;
        entries.push(entry);
    }
    Ok(entries)
}
