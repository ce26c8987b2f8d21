//! Loop-level tests for the lap logger.
//!
//! These tests verify that:
//! 1. One log line is written per decoded payload, in iteration order
//! 2. Empty decodes and capture failures write nothing and do not stop the loop
//! 3. Cancellation stops the loop before the next iteration, keeping prior lines
//! 4. Non-capture failures (decode and write errors) are counted and survived
//! 5. The written log reads back as the same (timestamp, payload) sequence

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use lap_logger::{
    read_log, CancelToken, CaptureError, Clock, CodeReader, DecodedPayload, Frame, FrameSource,
    LapLog, LapLogger, LoggerSettings, LoggerStats,
};

/// One scripted capture result. A frame's width carries its script index so
/// the reader can stay a pure function of the frame.
enum Shot {
    Frame,
    Fail,
}

struct ScriptedSource {
    shots: VecDeque<Shot>,
    captures: u32,
    cancel: CancelToken,
}

impl ScriptedSource {
    /// Cancels `cancel` while serving the last shot.
    fn new(shots: Vec<Shot>, cancel: CancelToken) -> Self {
        Self {
            shots: shots.into(),
            captures: 0,
            cancel,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn endpoint(&self) -> &str {
        "scripted://track"
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        self.captures += 1;
        let shot = self.shots.pop_front();
        if self.shots.is_empty() {
            self.cancel.cancel();
        }
        match shot {
            Some(Shot::Frame) => Frame::from_luma(self.captures, 1, vec![0; self.captures as usize])
                .map_err(|e| CaptureError::new("scripted://track", e)),
            Some(Shot::Fail) => Err(CaptureError::new("scripted://track", "camera offline")),
            None => panic!("capture called after script ended"),
        }
    }
}

/// Maps frame width (1-based capture number) to payloads.
struct ScriptedReader {
    by_capture: Vec<Vec<&'static str>>,
}

impl CodeReader for ScriptedReader {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn decode(&self, frame: &Frame) -> anyhow::Result<Vec<DecodedPayload>> {
        let index = frame.width as usize - 1;
        match self.by_capture.get(index) {
            Some(texts) if texts.contains(&"!") => Err(anyhow::anyhow!("sensor glitch")),
            Some(texts) => Ok(texts.iter().map(|t| DecodedPayload::new(*t)).collect()),
            None => Ok(Vec::new()),
        }
    }
}

/// Starts at 2024-01-01 00:00:00 and advances one second per call.
struct StepClock {
    next: Cell<i64>,
}

impl StepClock {
    fn new() -> Self {
        Self {
            next: Cell::new(1_704_067_200),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.next.get();
        self.next.set(secs + 1);
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }
}

fn fast() -> LoggerSettings {
    LoggerSettings {
        poll_interval: Duration::ZERO,
    }
}

struct Run {
    stats: LoggerStats,
    lines: Vec<String>,
    dir: tempfile::TempDir,
}

fn run_script(shots: Vec<Shot>, by_capture: Vec<Vec<&'static str>>) -> Run {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lap_log.txt");
    let cancel = CancelToken::new();
    let source = ScriptedSource::new(shots, cancel.clone());
    let log = LapLog::open(&path).expect("open log");
    let stats = LapLogger::new(source, ScriptedReader { by_capture }, log, fast())
        .with_clock(StepClock::new())
        .with_cancel_token(cancel)
        .run();
    let raw = std::fs::read_to_string(&path).expect("read log");
    Run {
        stats,
        lines: raw.lines().map(str::to_string).collect(),
        dir,
    }
}

#[test]
fn single_lap_line_matches_format() {
    let run = run_script(vec![Shot::Frame], vec![vec!["LAP:1"]]);
    assert_eq!(run.lines, vec!["2024-01-01 00:00:00, LAP:1"]);
    assert_eq!(run.stats.laps_logged, 1);
}

#[test]
fn logs_payloads_in_iteration_order_with_iteration_timestamps() {
    let run = run_script(
        vec![Shot::Frame, Shot::Frame, Shot::Frame],
        vec![vec!["A"], vec![], vec!["B", "C"]],
    );
    assert_eq!(
        run.lines,
        vec![
            "2024-01-01 00:00:00, A",
            "2024-01-01 00:00:01, B",
            "2024-01-01 00:00:01, C",
        ]
    );
    assert_eq!(
        run.stats,
        LoggerStats {
            iterations: 3,
            frames_captured: 3,
            laps_logged: 3,
            capture_failures: 0,
            errors: 0,
        }
    );
}

#[test]
fn capture_failure_skips_iteration_and_loop_continues() {
    let run = run_script(
        vec![Shot::Frame, Shot::Fail, Shot::Frame],
        vec![vec!["A"], vec!["never decoded"], vec!["B"]],
    );
    assert_eq!(
        run.lines,
        vec!["2024-01-01 00:00:00, A", "2024-01-01 00:00:01, B"]
    );
    assert_eq!(run.stats.iterations, 3);
    assert_eq!(run.stats.capture_failures, 1);
    assert_eq!(run.stats.frames_captured, 2);
}

#[test]
fn decode_error_is_survived() {
    let run = run_script(
        vec![Shot::Frame, Shot::Frame],
        vec![vec!["!"], vec!["after glitch"]],
    );
    assert_eq!(run.lines, vec!["2024-01-01 00:00:00, after glitch"]);
    assert_eq!(run.stats.errors, 1);
    assert_eq!(run.stats.laps_logged, 1);
}

#[test]
fn cancellation_stops_before_next_iteration_and_keeps_entries() {
    // The source cancels while serving the second shot; a third capture would panic.
    let run = run_script(
        vec![Shot::Frame, Shot::Frame],
        vec![vec!["A"], vec!["B"], vec!["C"]],
    );
    assert_eq!(run.stats.iterations, 2);
    assert_eq!(
        run.lines,
        vec!["2024-01-01 00:00:00, A", "2024-01-01 00:00:01, B"]
    );
}

#[test]
fn line_count_equals_total_decoded_payloads() {
    let script: Vec<Vec<&'static str>> = vec![
        vec!["1"],
        vec!["2", "3", "4"],
        vec![],
        vec!["5"],
        vec![],
        vec!["6", "7"],
    ];
    let expected: usize = script.iter().map(Vec::len).sum();
    let shots = (0..script.len()).map(|_| Shot::Frame).collect();
    let run = run_script(shots, script);
    assert_eq!(run.lines.len(), expected);
    assert_eq!(run.stats.laps_logged as usize, expected);
}

#[test]
fn log_reads_back_as_written_sequence() {
    let run = run_script(
        vec![Shot::Frame, Shot::Fail, Shot::Frame],
        vec![vec!["CAR-7", "CAR-12"], vec![], vec!["team, car\\7"]],
    );
    let entries = read_log(run.dir.path().join("lap_log.txt")).expect("read log");
    let pairs: Vec<(String, &str)> = entries
        .iter()
        .map(|e| (e.formatted_timestamp(), e.payload.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("2024-01-01 00:00:00".to_string(), "CAR-7"),
            ("2024-01-01 00:00:00".to_string(), "CAR-12"),
            ("2024-01-01 00:00:01".to_string(), "team, car\\7"),
        ]
    );
}

#[cfg(target_os = "linux")]
#[test]
fn append_failure_is_survived_and_polling_continues() {
    // Every write to /dev/full fails with ENOSPC.
    let cancel = CancelToken::new();
    let source = ScriptedSource::new(
        vec![Shot::Frame, Shot::Frame, Shot::Frame],
        cancel.clone(),
    );
    let reader = ScriptedReader {
        by_capture: vec![vec!["CAR-7"]; 3],
    };
    let log = LapLog::open("/dev/full").expect("open /dev/full");
    let stats = LapLogger::new(source, reader, log, fast())
        .with_clock(StepClock::new())
        .with_cancel_token(cancel)
        .run();
    assert_eq!(
        stats,
        LoggerStats {
            iterations: 3,
            frames_captured: 3,
            laps_logged: 0,
            capture_failures: 0,
            errors: 3,
        }
    );
}
