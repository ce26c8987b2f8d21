use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runner::LoggerSettings;

const DEFAULT_LOG_PATH: &str = "lap_log.txt";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LapLoggerConfigFile {
    log_path: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    poll: Option<PollConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PollConfigFile {
    interval_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LapLoggerConfig {
    pub log_path: PathBuf,
    pub endpoint: String,
    pub poll_interval: Duration,
    pub capture_timeout: Duration,
}

impl LapLoggerConfig {
    /// Load from an optional JSON file, then apply `LAPLOG_*` env overrides.
    ///
    /// Call `validate` after applying command-line overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) => read_config_file(path)?,
            None => LapLoggerConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: LapLoggerConfigFile) -> Self {
        let log_path = file
            .log_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
        let endpoint = file
            .camera
            .as_ref()
            .and_then(|camera| camera.url.clone())
            .unwrap_or_default();
        let capture_timeout = Duration::from_secs(
            file.camera
                .and_then(|camera| camera.timeout_secs)
                .unwrap_or(DEFAULT_CAPTURE_TIMEOUT_SECS),
        );
        let poll_interval = Duration::from_millis(
            file.poll
                .and_then(|poll| poll.interval_ms)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        );
        Self {
            log_path,
            endpoint,
            poll_interval,
            capture_timeout,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("LAPLOG_FILE") {
            if !path.trim().is_empty() {
                self.log_path = PathBuf::from(path);
            }
        }
        if let Ok(url) = std::env::var("LAPLOG_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.endpoint = url;
            }
        }
        if let Ok(interval) = std::env::var("LAPLOG_INTERVAL_MS") {
            let millis: u64 = interval
                .trim()
                .parse()
                .map_err(|_| anyhow!("LAPLOG_INTERVAL_MS must be an integer number of milliseconds"))?;
            self.poll_interval = Duration::from_millis(millis);
        }
        if let Ok(timeout) = std::env::var("LAPLOG_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .trim()
                .parse()
                .map_err(|_| anyhow!("LAPLOG_TIMEOUT_SECS must be an integer number of seconds"))?;
            self.capture_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Command-line values win over file and env.
    pub fn apply_overrides(
        &mut self,
        log_path: Option<PathBuf>,
        endpoint: Option<String>,
        poll_interval_ms: Option<u64>,
        capture_timeout_secs: Option<u64>,
    ) {
        if let Some(path) = log_path {
            self.log_path = path;
        }
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if let Some(millis) = poll_interval_ms {
            self.poll_interval = Duration::from_millis(millis);
        }
        if let Some(secs) = capture_timeout_secs {
            self.capture_timeout = Duration::from_secs(secs);
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.log_path.as_os_str().is_empty() {
            return Err(anyhow!("log file path must not be empty"));
        }
        self.endpoint = self.endpoint.trim().to_string();
        if self.endpoint.is_empty() {
            return Err(anyhow!(
                "camera endpoint must be set (argument, LAPLOG_CAMERA_URL, or camera.url)"
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be greater than zero"));
        }
        if self.capture_timeout.is_zero() {
            return Err(anyhow!("capture timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn logger_settings(&self) -> LoggerSettings {
        LoggerSettings {
            poll_interval: self.poll_interval,
        }
    }
}

fn read_config_file(path: &Path) -> Result<LapLoggerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
