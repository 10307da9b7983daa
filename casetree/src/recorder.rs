//! Per-case status and log capture.
//!
//! A [`CaseRecorder`] collects the log messages of one case run; its final
//! status is the worst severity logged. [`Logger`] keeps the finished
//! results of a whole run, keyed by case query, and exports them as JSON.

use std::fmt;
use std::mem;
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;

use crate::Result;

/// Final status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Skip,
    Warn,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pass => "pass",
            Status::Skip => "skip",
            Status::Warn => "warn",
            Status::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Severity of a log message, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Pass,
    Skip,
    Warn,
    ExpectFailed,
    ThrewException,
}

impl LogSeverity {
    pub fn status(self) -> Status {
        match self {
            LogSeverity::Pass => Status::Pass,
            LogSeverity::Skip => Status::Skip,
            LogSeverity::Warn => Status::Warn,
            LogSeverity::ExpectFailed | LogSeverity::ThrewException => Status::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    /// Short label: `DEBUG`, `INFO`, `SKIP`, ...
    pub name: String,
    pub severity: LogSeverity,
    pub message: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// The outcome of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub status: Status,
    #[serde(rename = "timems")]
    pub time_ms: f64,
    pub logs: Vec<LogMessage>,
}

/// Collects the logs of one case run.
#[derive(Debug)]
pub struct CaseRecorder {
    debugging: bool,
    started: Option<Instant>,
    injected_time_ms: Option<f64>,
    severity: LogSeverity,
    logs: Vec<LogMessage>,
}

impl CaseRecorder {
    /// Debug messages are only kept when `debugging` is set.
    pub fn new(debugging: bool) -> Self {
        Self {
            debugging,
            started: None,
            injected_time_ms: None,
            severity: LogSeverity::Pass,
            logs: Vec::new(),
        }
    }

    /// Reset state and start the clock.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.injected_time_ms = None;
        self.severity = LogSeverity::Pass;
        self.logs.clear();
    }

    /// Stop the clock and hand out the result. The recorder can be reused.
    pub fn finish(&mut self) -> CaseResult {
        let time_ms = self.injected_time_ms.take().unwrap_or_else(|| {
            self.started
                .take()
                .map_or(0.0, |t| t.elapsed().as_secs_f64() * 1000.0)
        });
        let result = CaseResult {
            status: self.severity.status(),
            time_ms,
            logs: mem::take(&mut self.logs),
        };
        self.severity = LogSeverity::Pass;
        result
    }

    pub fn is_debugging(&self) -> bool {
        self.debugging
    }

    /// Status the case would finish with right now.
    pub fn status(&self) -> Status {
        self.severity.status()
    }

    fn log(&mut self, name: &str, severity: LogSeverity, message: String) {
        self.severity = self.severity.max(severity);
        self.logs.push(LogMessage {
            name: name.to_string(),
            severity,
            message,
        });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        if self.debugging {
            self.log("DEBUG", LogSeverity::Pass, message.into());
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log("INFO", LogSeverity::Pass, message.into());
    }

    pub fn skipped(&mut self, message: impl Into<String>) {
        self.log("SKIP", LogSeverity::Skip, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log("WARN", LogSeverity::Warn, message.into());
    }

    pub fn expectation_failed(&mut self, message: impl Into<String>) {
        self.log("EXPECTATION FAILED", LogSeverity::ExpectFailed, message.into());
    }

    pub fn threw(&mut self, message: impl Into<String>) {
        self.log("EXCEPTION", LogSeverity::ThrewException, message.into());
    }

    /// Turn a failing case into a pass, keeping its logs.
    pub fn expected_failure(&mut self, message: impl Into<String>) {
        self.severity = LogSeverity::Pass;
        self.log("INFO", LogSeverity::Pass, message.into());
    }

    /// Replace the recorded state with a result produced elsewhere.
    pub fn inject(&mut self, result: CaseResult) {
        self.started = None;
        self.injected_time_ms = Some(result.time_ms);
        self.severity = result
            .logs
            .iter()
            .map(|log| log.severity)
            .fold(LogSeverity::Pass, LogSeverity::max);
        // Keep the reported status even when the logs do not explain it.
        let floor = match result.status {
            Status::Pass => LogSeverity::Pass,
            Status::Skip => LogSeverity::Skip,
            Status::Warn => LogSeverity::Warn,
            Status::Fail => LogSeverity::ExpectFailed,
        };
        self.severity = self.severity.max(floor);
        self.logs = result.logs;
    }
}

/// Results of a run, in the order the cases finished.
#[derive(Debug, Default)]
pub struct Logger {
    debugging: bool,
    results: IndexMap<String, CaseResult>,
}

impl Logger {
    pub fn new(debugging: bool) -> Self {
        Self {
            debugging,
            results: IndexMap::new(),
        }
    }

    /// A fresh recorder sharing this logger's debug setting.
    pub fn recorder(&self) -> CaseRecorder {
        CaseRecorder::new(self.debugging)
    }

    pub fn record(&mut self, name: impl Into<String>, result: CaseResult) {
        self.results.insert(name.into(), result);
    }

    pub fn get(&self, name: &str) -> Option<&CaseResult> {
        self.results.get(name)
    }

    pub fn results(&self) -> impl Iterator<Item = (&str, &CaseResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }

    /// Pretty-printed JSON object of all results.
    pub fn as_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.results)?)
    }
}
