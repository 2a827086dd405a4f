use super::types::StingrayError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
    pub exit_code: i32,
}

impl StingrayError {
    /// Classify this error: its type name, whether a read may be retried,
    /// and the process exit code reported to the CI job.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable on read calls
            StingrayError::Transport { .. } => ErrorClassification {
                error_type: "TransportError",
                retryable: true,
                exit_code: 3,
            },
            StingrayError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
                exit_code: 1,
            },

            // Precondition errors
            StingrayError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
                exit_code: 2,
            },
            StingrayError::BinaryNotFound(_) => ErrorClassification {
                error_type: "BinaryNotFoundError",
                retryable: false,
                exit_code: 2,
            },
            StingrayError::Submission { .. } => ErrorClassification {
                error_type: "SubmissionError",
                retryable: false,
                exit_code: 1,
            },

            // Decode errors are never retried
            StingrayError::Decode { .. } => ErrorClassification {
                error_type: "DecodeError",
                retryable: false,
                exit_code: 5,
            },
            StingrayError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
                exit_code: 5,
            },

            // Scan lifecycle errors
            StingrayError::PollingExhausted { .. } => ErrorClassification {
                error_type: "PollingExhaustedError",
                retryable: false,
                exit_code: 3,
            },
            StingrayError::UnexpectedPhase { .. } => ErrorClassification {
                error_type: "UnexpectedPhaseError",
                retryable: false,
                exit_code: 3,
            },
            StingrayError::UnknownStatus { .. } => ErrorClassification {
                error_type: "UnknownStatusError",
                retryable: false,
                exit_code: 3,
            },
            StingrayError::ScanFailed { .. } => ErrorClassification {
                error_type: "ScanFailedError",
                retryable: false,
                exit_code: 3,
            },
            StingrayError::Cancelled { .. } => ErrorClassification {
                error_type: "CancelledError",
                retryable: false,
                exit_code: 130,
            },
            StingrayError::Summary { .. } => ErrorClassification {
                error_type: "SummaryError",
                retryable: false,
                exit_code: 5,
            },

            StingrayError::Report(_) => ErrorClassification {
                error_type: "ReportError",
                retryable: false,
                exit_code: 1,
            },
            StingrayError::Distribution(_) => ErrorClassification {
                error_type: "DistributionError",
                retryable: false,
                exit_code: 4,
            },
            StingrayError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: false,
                exit_code: 1,
            },
            StingrayError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
                exit_code: 2,
            },
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.classify().exit_code
    }
}
