use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProfileId, ScanId, ScanPhase, TestCaseId};

/// Lifecycle of a single scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Submitted,
    Polling(PollStage),
    ResultsFetched,
    Reported,
    Failed,
}

/// Which wait a poll loop is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollStage {
    /// Unbounded wait for any terminal phase.
    UntilTerminal,
    /// Bounded wait until the scan leaves its queued phases.
    UntilStarted,
    /// Bounded wait until running and analysis are over.
    UntilFinished,
}

impl PollStage {
    /// Whether `phase` ends this stage's wait.
    pub fn is_done(&self, phase: ScanPhase) -> bool {
        match self {
            Self::UntilTerminal => phase.is_terminal(),
            Self::UntilStarted => !matches!(phase, ScanPhase::Submitted | ScanPhase::Queued),
            Self::UntilFinished => !matches!(phase, ScanPhase::Running | ScanPhase::WaitingAnalysis),
        }
    }
}

impl fmt::Display for PollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UntilTerminal => write!(f, "until-terminal"),
            Self::UntilStarted => write!(f, "until-started"),
            Self::UntilFinished => write!(f, "until-finished"),
        }
    }
}

/// Kind of consolidated report requested for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Deduplicated by exact (name, details).
    Standard,
    /// Grouped by name, collecting distinct details.
    Grouping,
    /// One report per test case, no merging.
    Separate,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Grouping => "grouping",
            Self::Separate => "separate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "grouping" => Some(Self::Grouping),
            "separate" => Some(Self::Separate),
            _ => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub binary: PathBuf,
    pub profile: ProfileId,
    pub testcases: Vec<TestCaseId>,
    pub poll_interval: Duration,
    /// Status checks allowed per bounded stage.
    pub max_attempts: u32,
    pub no_wait: bool,
    pub report_kinds: Vec<ReportKind>,
    pub output_dir: PathBuf,
    pub json_file: Option<String>,
}

impl RunConfig {
    /// Report kinds actually produced: a single test case has nothing to
    /// merge, so `standard` is dropped and `separate` is the fallback.
    pub fn effective_report_kinds(&self) -> Vec<ReportKind> {
        let mut kinds: Vec<ReportKind> = Vec::new();
        for kind in &self.report_kinds {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        if kinds.is_empty() {
            kinds.push(ReportKind::Standard);
        }
        if self.testcases.len() <= 1 {
            kinds.retain(|k| *k != ReportKind::Standard);
            if kinds.is_empty() {
                kinds.push(ReportKind::Separate);
            }
        }
        kinds
    }

    /// JSON file name with the `.json` suffix enforced.
    pub fn json_file_path(&self) -> Option<PathBuf> {
        self.json_file.as_ref().map(|name| {
            if name.ends_with(".json") {
                self.output_dir.join(name)
            } else {
                self.output_dir.join(format!("{}.json", name))
            }
        })
    }
}

/// Result of one completed scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub testcase: TestCaseId,
    pub scan_id: ScanId,
    pub phase: ScanPhase,
    pub issues: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sessions: Vec<SessionOutcome>,
    pub total_issues: usize,
    pub reports: Vec<PathBuf>,
}
