use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::models::{ScanId, ScanPhase, TestCaseId};
use crate::reporting::format_summary_table;
use super::state::PollStage;

/// Lifecycle events emitted by the poller, sessions and the orchestrator.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A run over one or more test cases started
    RunStarted {
        binary: PathBuf,
        testcases: Vec<TestCaseId>,
    },
    /// A test case is about to be submitted
    TestCaseStarted {
        testcase: TestCaseId,
    },
    /// The service accepted the binary and issued a scan id
    Submitted {
        testcase: TestCaseId,
        scan_id: ScanId,
    },
    /// One status query was answered and classified
    StatusChecked {
        scan_id: ScanId,
        phase: ScanPhase,
        attempt: u32,
    },
    /// The poller is about to sleep before the next query
    Waiting {
        scan_id: ScanId,
        delay_secs: u64,
    },
    /// A bounded wait stage ended
    StageCompleted {
        scan_id: ScanId,
        stage: PollStage,
        phase: ScanPhase,
        attempts: u32,
    },
    /// Raw issues were fetched for a finished scan
    IssuesFetched {
        scan_id: ScanId,
        count: usize,
    },
    /// Vulnerability summary reported by the service
    SummaryFetched {
        scan_id: ScanId,
        summary: serde_json::Value,
    },
    /// A report file was written
    ReportWritten {
        kind: String,
        path: PathBuf,
    },
    /// A test case finished and its issues were folded into the run
    TestCaseCompleted {
        testcase: TestCaseId,
        scan_id: ScanId,
        issues: usize,
    },
    /// Non-fatal condition worth surfacing to the operator
    Warning {
        message: String,
    },
    /// All test cases finished
    RunCompleted {
        total_issues: usize,
        reports: usize,
    },
}

/// Logging capability injected into every pipeline component.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

/// Renders events as structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::RunStarted { binary, testcases } => {
                info!(binary = %binary.display(), testcases = testcases.len(), "Starting automated scan run");
            }
            ScanEvent::TestCaseStarted { testcase } => {
                info!(testcase = %testcase, "Processing test case");
            }
            ScanEvent::Submitted { testcase, scan_id } => {
                info!(testcase = %testcase, scan_id = %scan_id, "Scan successfully started");
            }
            ScanEvent::StatusChecked { scan_id, phase, attempt } => {
                info!(scan_id = %scan_id, phase = %phase, attempt, "Current scan status");
            }
            ScanEvent::Waiting { scan_id, delay_secs } => {
                debug!(scan_id = %scan_id, delay_secs, "Waiting before next status check");
            }
            ScanEvent::StageCompleted { scan_id, stage, phase, attempts } => {
                info!(scan_id = %scan_id, stage = %stage, phase = %phase, attempts, "Wait stage finished");
            }
            ScanEvent::IssuesFetched { scan_id, count } => {
                info!(scan_id = %scan_id, count, "Scan complete, issues fetched");
            }
            ScanEvent::SummaryFetched { scan_id, summary } => {
                info!(scan_id = %scan_id, "Vulnerability summary:\n{}", format_summary_table(&summary));
            }
            ScanEvent::ReportWritten { kind, path } => {
                info!(kind = %kind, path = %path.display(), "Report written");
            }
            ScanEvent::TestCaseCompleted { testcase, scan_id, issues } => {
                info!(testcase = %testcase, scan_id = %scan_id, issues, "Test case completed");
            }
            ScanEvent::Warning { message } => {
                warn!("{}", message);
            }
            ScanEvent::RunCompleted { total_issues, reports } => {
                info!(total_issues, reports, "Job completed successfully");
            }
        }
    }
}

/// Keeps every event in memory, for tests and post-run inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of status queries observed.
    pub fn status_checks(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ScanEvent::StatusChecked { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ScanEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
