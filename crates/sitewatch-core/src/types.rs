//! Shared types used across sitewatch crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Status ─────────────────────────────────────────────────────────

/// Availability of a target as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
}

impl Status {
    /// Classify an HTTP status code: 2xx and 3xx are up, everything else
    /// (including the no-response sentinel) is down.
    pub fn from_code(code: HttpCode) -> Self {
        match code.0 {
            200..=399 => Status::Up,
            _ => Status::Down,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "UP",
            Status::Down => "DOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Status::Up),
            "DOWN" => Ok(Status::Down),
            other => Err(format!("unknown status {other:?}")),
        }
    }
}

// ── HttpCode ───────────────────────────────────────────────────────

/// HTTP status code returned by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpCode(pub u16);

impl HttpCode {
    /// No response at all: DNS failure, refused connection, or timeout.
    pub const NO_RESPONSE: HttpCode = HttpCode(0);

    /// A syntactically valid three-digit status code.
    pub fn is_valid(&self) -> bool {
        (100..=999).contains(&self.0)
    }
}

impl fmt::Display for HttpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

// ── StatusRecord ───────────────────────────────────────────────────

/// Persisted per-target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Status,
    /// Unix timestamp (seconds) of the start of the current streak.
    pub since: u64,
    /// Consecutive DOWN observations since the last UP.
    pub failure_count: u32,
}

impl StatusRecord {
    pub fn up(since: u64) -> Self {
        Self {
            status: Status::Up,
            since,
            failure_count: 0,
        }
    }

    /// A DOWN record; a count of zero is only produced by legacy store lines.
    pub fn down(since: u64, failure_count: u32) -> Self {
        Self {
            status: Status::Down,
            since,
            failure_count,
        }
    }

    pub fn is_down(&self) -> bool {
        self.status == Status::Down
    }

    /// Whether this streak has reached the alerting threshold.
    pub fn past_grace(&self, grace_period: u32) -> bool {
        self.is_down() && self.failure_count >= grace_period
    }
}

// ── Alerts ─────────────────────────────────────────────────────────

/// One line of a summary alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub target: String,
    pub since: u64,
    pub downtime_secs: u64,
}

/// An alert produced during a run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    Down {
        target: String,
        since: u64,
        code: HttpCode,
    },
    Up {
        target: String,
        at: u64,
        downtime_secs: u64,
    },
    Summary { entries: Vec<SummaryEntry> },
}

impl AlertEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AlertEvent::Down { .. } => "down",
            AlertEvent::Up { .. } => "up",
            AlertEvent::Summary { .. } => "summary",
        }
    }
}

/// Host part of a target URL, or the raw target when it does not parse.
pub fn target_host(target: &str) -> String {
    url::Url::parse(target)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| target.to_string())
}
