use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a scan, independent of the wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Submitted,
    Queued,
    Running,
    WaitingAnalysis,
    Succeeded,
    Failed,
    /// A status the interpreter could not classify.
    Unknown,
}

impl ScanPhase {
    /// Succeeded and Failed are terminal; Unknown is handled as an error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::Succeeded | ScanPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::WaitingAnalysis => "waiting-analysis",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status value exactly as the service reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Code(i64),
    Named(String),
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawStatus::Code(code) => write!(f, "{}", code),
            RawStatus::Named(name) => f.write_str(name),
        }
    }
}
