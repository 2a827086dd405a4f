use thiserror::Error;

use crate::models::{ScanId, ScanPhase};

#[derive(Debug, Error)]
pub enum StingrayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Binary not found at path: {0}")]
    BinaryNotFound(String),

    #[error("Scan submission failed: {message}")]
    Submission { status: Option<u16>, message: String },

    #[error("Request to {url} failed with status {status}: {body}")]
    Transport { url: String, status: u16, body: String },

    #[error("Failed to decode response from {url} (status {status}): {reason}")]
    Decode { url: String, status: u16, reason: String },

    #[error("Scan {scan_id} did not leave phase {last_phase} after {attempts} status checks")]
    PollingExhausted {
        scan_id: ScanId,
        last_phase: ScanPhase,
        attempts: u32,
    },

    #[error("Scan {scan_id} is in phase {actual}, expected {expected}")]
    UnexpectedPhase {
        scan_id: ScanId,
        actual: ScanPhase,
        expected: String,
    },

    #[error("Scan {scan_id} reported an unrecognized status: {raw}")]
    UnknownStatus { scan_id: ScanId, raw: String },

    #[error("Scan {scan_id} finished with phase {phase}")]
    ScanFailed { scan_id: ScanId, phase: ScanPhase },

    #[error("Scan {scan_id} cancelled (last phase: {last_phase})")]
    Cancelled {
        scan_id: ScanId,
        last_phase: String,
    },

    #[error("Scan summary unavailable for {scan_id}: {message}")]
    Summary { scan_id: ScanId, message: String },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<reqwest::Error> for StingrayError {
    fn from(err: reqwest::Error) -> Self {
        StingrayError::Network(err.to_string())
    }
}
