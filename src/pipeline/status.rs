use serde::{Deserialize, Serialize};

use crate::models::{RawStatus, ScanPhase};

/// Signature of a status classifier injected into the poller.
pub type Classifier = fn(&RawStatus) -> ScanPhase;

/// Status vocabulary spoken by a service API generation.
///
/// Resolved once per transport; shared polling code only ever sees the
/// classifier returned by [`StatusVocabulary::classifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVocabulary {
    /// Integer status codes of the legacy CI endpoint.
    Legacy,
    /// Named states of the current REST API.
    Current,
}

impl StatusVocabulary {
    pub fn classifier(self) -> Classifier {
        match self {
            Self::Legacy => classify_legacy,
            Self::Current => classify_current,
        }
    }

    pub fn classify(self, raw: &RawStatus) -> ScanPhase {
        (self.classifier())(raw)
    }
}

/// Legacy integer codes. Named values are never valid here.
pub fn classify_legacy(raw: &RawStatus) -> ScanPhase {
    match raw {
        RawStatus::Code(1) => ScanPhase::Succeeded,
        RawStatus::Code(2) => ScanPhase::Failed,
        RawStatus::Code(3) => ScanPhase::Running,
        RawStatus::Code(4) => ScanPhase::Queued,
        RawStatus::Code(5) => ScanPhase::Submitted,
        RawStatus::Code(6) => ScanPhase::WaitingAnalysis,
        _ => ScanPhase::Unknown,
    }
}

/// Current named states, matched case-insensitively.
pub fn classify_current(raw: &RawStatus) -> ScanPhase {
    let RawStatus::Named(name) = raw else {
        return ScanPhase::Unknown;
    };
    match name.trim().to_ascii_lowercase().as_str() {
        "created" => ScanPhase::Submitted,
        "starting" => ScanPhase::Queued,
        "started" => ScanPhase::Running,
        "analyzing" => ScanPhase::WaitingAnalysis,
        "success" => ScanPhase::Succeeded,
        "error" => ScanPhase::Failed,
        _ => ScanPhase::Unknown,
    }
}
