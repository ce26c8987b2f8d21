//! Lap report built from an existing lap log.
//!
//! The logger writes one line per sighting, so a car parked in front of the
//! camera produces a burst of identical entries. The report collapses each
//! burst into a single crossing and derives lap times between crossings.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;

use crate::lap_log::{DecodedPayload, LogEntry, TIMESTAMP_FORMAT};

/// Default gap under which repeated sightings count as one crossing.
pub const DEFAULT_DEBOUNCE_SECS: i64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crossing {
    /// 1-based crossing number for this code.
    pub number: usize,
    /// First sighting of the burst.
    pub at: DateTime<Utc>,
    /// Time since the previous crossing; `None` for the first.
    pub lap_time: Option<Duration>,
    pub sightings: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeSummary {
    pub payload: DecodedPayload,
    pub crossings: Vec<Crossing>,
}

impl CodeSummary {
    /// Completed laps (crossings after the first).
    pub fn laps(&self) -> usize {
        self.crossings.len().saturating_sub(1)
    }

    pub fn best_lap(&self) -> Option<Duration> {
        self.crossings.iter().filter_map(|c| c.lap_time).min()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LapReport {
    /// Codes in order of first appearance.
    pub codes: Vec<CodeSummary>,
    /// Log entries behind the codes in this report.
    pub entries: usize,
}

impl LapReport {
    /// Keep only `payload`. Returns false if the code never appeared.
    ///
    /// `entries` is recounted from the kept sightings.
    pub fn retain_code(&mut self, payload: &str) -> bool {
        self.codes.retain(|code| code.payload.as_str() == payload);
        self.entries = self
            .codes
            .iter()
            .flat_map(|code| code.crossings.iter())
            .map(|crossing| crossing.sightings)
            .sum();
        !self.codes.is_empty()
    }
}

/// Debounce window from a whole number of seconds.
pub fn debounce_from_secs(secs: i64) -> Result<Duration> {
    if secs < 0 {
        return Err(anyhow!("debounce must not be negative (got {}s)", secs));
    }
    Duration::try_seconds(secs).ok_or_else(|| anyhow!("debounce of {}s is out of range", secs))
}

/// Group `entries` (in log order) into crossings per code.
///
/// A sighting no more than `debounce` after the previous sighting of the same
/// code extends the current crossing.
pub fn build_report(entries: &[LogEntry], debounce: Duration) -> LapReport {
    let mut report = LapReport {
        codes: Vec::new(),
        entries: entries.len(),
    };
    let mut index_of: HashMap<&DecodedPayload, usize> = HashMap::new();
    let mut last_seen: Vec<DateTime<Utc>> = Vec::new();

    for entry in entries {
        let Some(&idx) = index_of.get(&entry.payload) else {
            index_of.insert(&entry.payload, report.codes.len());
            last_seen.push(entry.timestamp);
            report.codes.push(CodeSummary {
                payload: entry.payload.clone(),
                crossings: vec![Crossing {
                    number: 1,
                    at: entry.timestamp,
                    lap_time: None,
                    sightings: 1,
                }],
            });
            continue;
        };

        let code = &mut report.codes[idx];
        let gap = entry.timestamp - last_seen[idx];
        last_seen[idx] = entry.timestamp;
        if gap <= debounce {
            if let Some(current) = code.crossings.last_mut() {
                current.sightings += 1;
            }
            continue;
        }

        let previous = code.crossings.last().map(|c| c.at);
        code.crossings.push(Crossing {
            number: code.crossings.len() + 1,
            at: entry.timestamp,
            lap_time: previous.map(|at| entry.timestamp - at),
            sightings: 1,
        });
    }
    report
}

/// `M:SS`, or `H:MM:SS` past an hour.
pub fn format_lap_time(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

impl fmt::Display for LapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} entries, {} codes", self.entries, self.codes.len())?;
        for code in &self.codes {
            writeln!(f)?;
            let best = code
                .best_lap()
                .map(format_lap_time)
                .unwrap_or_else(|| "-".to_string());
            writeln!(f, "{}: {} laps, best {}", code.payload, code.laps(), best)?;
            for crossing in &code.crossings {
                let lap = crossing
                    .lap_time
                    .map(format_lap_time)
                    .unwrap_or_else(|| "start".to_string());
                writeln!(
                    f,
                    "  #{:<3} {}  {:>8}  ({} sightings)",
                    crossing.number,
                    crossing.at.format(TIMESTAMP_FORMAT),
                    lap,
                    crossing.sightings
                )?;
            }
        }
        Ok(())
    }
}
