//! Lap logging loop.
//!
//! `LapLogger` drives one capture, one decode and zero or more log appends per
//! iteration, then sleeps for the poll interval. It runs until its
//! `CancelToken` is cancelled.
//!
//! Failure policy:
//! - `CaptureError`: reported, iteration skipped, loop continues.
//! - anything else: reported, iteration abandoned, loop continues.
//!
//! Entries already appended during an abandoned iteration stay in the log.

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::detect::CodeReader;
use crate::error::LapError;
use crate::ingest::FrameSource;
use crate::lap_log::{LapLog, LogEntry};

/// Default pause between iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wall-clock source for entry timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cooperative cancellation shared between the loop and a signal handler.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration`, returning early if cancelled.
    ///
    /// Returns true when the token is cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if duration.is_zero() {
            return *guard;
        }
        let (guard, _timeout) = cvar
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoggerState {
    Running,
    /// Terminal. No capture, decode or append happens after this.
    Stopped,
}

#[derive(Clone, Debug)]
pub struct LoggerSettings {
    pub poll_interval: Duration,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoggerStats {
    pub iterations: u64,
    pub frames_captured: u64,
    pub laps_logged: u64,
    pub capture_failures: u64,
    pub errors: u64,
}

/// Entries appended by one successful iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IterationOutcome {
    pub entries: Vec<LogEntry>,
}

pub struct LapLogger<S, R, C = SystemClock> {
    source: S,
    reader: R,
    clock: C,
    log: LapLog,
    settings: LoggerSettings,
    cancel: CancelToken,
    state: LoggerState,
    stats: LoggerStats,
}

impl<S: FrameSource, R: CodeReader> LapLogger<S, R, SystemClock> {
    pub fn new(source: S, reader: R, log: LapLog, settings: LoggerSettings) -> Self {
        Self {
            source,
            reader,
            clock: SystemClock,
            log,
            settings,
            cancel: CancelToken::new(),
            state: LoggerState::Running,
            stats: LoggerStats::default(),
        }
    }
}

impl<S: FrameSource, R: CodeReader, C: Clock> LapLogger<S, R, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> LapLogger<S, R, C2> {
        LapLogger {
            source: self.source,
            reader: self.reader,
            clock,
            log: self.log,
            settings: self.settings,
            cancel: self.cancel,
            state: self.state,
            stats: self.stats,
        }
    }

    /// Use an existing token, e.g. one already wired to a signal handler.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> LoggerState {
        self.state
    }

    pub fn stats(&self) -> &LoggerStats {
        &self.stats
    }

    /// Run one capture/decode/append pass.
    pub fn run_once(&mut self) -> Result<IterationOutcome, LapError> {
        self.stats.iterations += 1;

        let frame = self.source.capture()?;
        self.stats.frames_captured += 1;

        let payloads = self
            .reader
            .decode(&frame)
            .with_context(|| format!("{} reader failed on {:?}", self.reader.name(), frame))?;
        log::debug!(
            "decoded {} payloads, frame age {}ms",
            payloads.len(),
            frame.age().as_millis()
        );
        drop(frame);

        let mut outcome = IterationOutcome::default();
        if payloads.is_empty() {
            return Ok(outcome);
        }

        let timestamp = self.clock.now();
        for payload in payloads {
            let entry = LogEntry::new(timestamp, payload);
            self.log.append(&entry)?;
            self.stats.laps_logged += 1;
            log::info!(
                "Lap logged: {} at {}",
                entry.payload,
                entry.formatted_timestamp()
            );
            outcome.entries.push(entry);
        }
        Ok(outcome)
    }

    /// Poll until cancelled. Consumes the logger so the log file is closed on
    /// return.
    pub fn run(mut self) -> LoggerStats {
        log::info!(
            "lap logger running: {} -> {} (reader={}, interval={}ms)",
            self.source.endpoint(),
            self.log.path().display(),
            self.reader.name(),
            self.settings.poll_interval.as_millis()
        );

        if self.cancel.is_cancelled() {
            self.state = LoggerState::Stopped;
        }
        while self.state == LoggerState::Running {
            match self.run_once() {
                Ok(outcome) => {
                    log::debug!("iteration logged {} entries", outcome.entries.len());
                }
                Err(LapError::Capture(err)) => {
                    self.stats.capture_failures += 1;
                    log::warn!("{}", err);
                }
                Err(err) => {
                    self.stats.errors += 1;
                    log::error!("Error: {}", err);
                }
            }

            if self.cancel.sleep(self.settings.poll_interval) {
                self.state = LoggerState::Stopped;
            }
        }

        log::info!("Logging stopped.");
        log::info!(
            "iterations={} frames={} laps={} capture_failures={} errors={}",
            self.stats.iterations,
            self.stats.frames_captured,
            self.stats.laps_logged,
            self.stats.capture_failures,
            self.stats.errors
        );
        self.stats
    }
}
