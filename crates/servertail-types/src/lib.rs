//! Shared types for servertail
//!
//! This crate contains data structures used across multiple servertail crates.

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Log Types
// ============================================================================

/// Severity of a console line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Log,
    Warn,
    Error,
    Debug,
    Info,
    #[default]
    Unknown,
}

impl Severity {
    /// Every severity a record can carry, in display order
    pub const ALL: [Severity; 6] = [
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Log,
        Self::Debug,
        Self::Unknown,
    ];

    /// Parse a severity keyword (case-insensitive). Returns `None` for anything
    /// that is not one of the five keywords.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "LOG" => Some(Self::Log),
            "WARN" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            _ => None,
        }
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "LOG",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Short display string (3 chars)
    pub fn short(&self) -> &'static str {
        match self {
            Self::Log => "LOG",
            Self::Warn => "WRN",
            Self::Error => "ERR",
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Unknown => "???",
        }
    }

    /// Get display color for this severity
    pub fn color(&self) -> Color {
        match self {
            Self::Log => Color::Gray,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Unknown => Color::White,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A console line after classification.
///
/// Built once from a raw line and never mutated. An empty `category` means the
/// line carried none.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub raw: String,
}

impl ClassifiedRecord {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Whether the line carried a category word
    pub fn has_category(&self) -> bool {
        !self.category.is_empty()
    }
}

/// An already-classified record pushed by an in-process producer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushRecord {
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Producer of the record (a tracing target for the internal log)
    pub source: String,
}

impl PushRecord {
    pub fn new(severity: Severity, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }
}

// ============================================================================
// Stream Types
// ============================================================================

/// Scheduler states. There is no terminal state: a stream ends when its
/// subscriber tears it down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchedulerState {
    #[default]
    Running,
    Paused,
}

impl SchedulerState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "LIVE",
            Self::Paused => "PAUSED",
        }
    }
}

/// Per-stream view state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamState {
    /// Suppresses scheduled reads; the cursor stays valid
    pub paused: bool,
    pub last_known_offset: u64,
    /// Whether the noise filter is applied when rendering
    pub filtered: bool,
}

impl StreamState {
    pub fn scheduler_state(&self) -> SchedulerState {
        if self.paused {
            SchedulerState::Paused
        } else {
            SchedulerState::Running
        }
    }
}

/// What is known about a tailed file after the latest stat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
    pub exists: bool,
}

impl SourceInfo {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            size: 0,
            exists: false,
        }
    }
}

// ============================================================================
// Service Responses
// ============================================================================

/// Response to an initial snapshot fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub lines: Vec<String>,
    /// Starting cursor for subsequent incremental fetches
    pub size: u64,
    pub path: String,
    pub exists: bool,
}

/// Response to an incremental fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaResponse {
    pub new_lines: Vec<String>,
    /// When set, `new_lines` replaces everything the caller displays
    pub rotated: bool,
    pub current_size: u64,
}
