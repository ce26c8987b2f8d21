use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use std::fmt;

/// Timestamp layout of a log line (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FIELD_SEPARATOR: &str = ", ";

/// Text recovered from one code symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecodedPayload(String);

impl DecodedPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logged lap: a payload and the UTC second it was seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub payload: DecodedPayload,
}

impl LogEntry {
    /// Sub-second precision is dropped so entries compare equal after a
    /// write/read cycle.
    pub fn new(timestamp: DateTime<Utc>, payload: DecodedPayload) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            payload,
        }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Render an entry as one log line, without the trailing newline.
///
/// Backslash, LF and CR inside the payload are escaped so that every entry
/// stays on a single line.
pub fn format_line(entry: &LogEntry) -> String {
    format!(
        "{}{}{}",
        entry.formatted_timestamp(),
        FIELD_SEPARATOR,
        escape_payload(entry.payload.as_str())
    )
}

/// Parse one log line (trailing newline optional).
pub fn parse_line(line: &str) -> Result<LogEntry> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (timestamp, payload) = line
        .split_once(FIELD_SEPARATOR)
        .ok_or_else(|| anyhow!("missing '{}' separator", FIELD_SEPARATOR.trim()))?;
    let naive = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid timestamp '{}'", timestamp))?;
    let payload = unescape_payload(payload)?;
    Ok(LogEntry::new(
        Utc.from_utc_datetime(&naive),
        DecodedPayload::new(payload),
    ))
}

fn escape_payload(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_payload(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(anyhow!("unknown escape '\\{}' in payload", other)),
            None => return Err(anyhow!("dangling '\\' at end of payload")),
        }
    }
    Ok(out)
}
