use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use stingray_scan::errors::{with_read_retry, RetryPolicy};
use stingray_scan::models::{ProfileId, RawIssue, RawStatus, ScanId, ScanPhase, TestCaseId};
use stingray_scan::pipeline::{
    RecordingSink, ReportKind, RunConfig, ScanEvent, ScanOrchestrator, StatusVocabulary,
};
use stingray_scan::transport::ScanTransport;
use stingray_scan::StingrayError;

/// Legacy-style service: every scan walks through the same status script.
struct ScriptedService {
    script: Vec<i64>,
    remaining: Mutex<VecDeque<i64>>,
    status_calls: Mutex<u32>,
    cancel_after: Option<(u32, CancellationToken)>,
}

impl ScriptedService {
    fn new(script: Vec<i64>) -> Self {
        Self {
            remaining: Mutex::new(script.clone().into()),
            script,
            status_calls: Mutex::new(0),
            cancel_after: None,
        }
    }
}

#[async_trait]
impl ScanTransport for ScriptedService {
    fn vocabulary(&self) -> StatusVocabulary {
        StatusVocabulary::Legacy
    }

    async fn submit(&self, _: &Path, _: ProfileId, testcase: TestCaseId) -> Result<ScanId, StingrayError> {
        *self.remaining.lock().unwrap() = self.script.clone().into();
        Ok(ScanId::from(format!("{}00", testcase)))
    }

    async fn get_status(&self, _: &ScanId) -> Result<RawStatus, StingrayError> {
        let calls = {
            let mut calls = self.status_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if let Some((after, token)) = &self.cancel_after {
            if calls >= *after {
                token.cancel();
            }
        }
        let code = self.remaining.lock().unwrap().pop_front().unwrap_or(3);
        Ok(RawStatus::Code(code))
    }

    async fn get_issues(&self, scan_id: &ScanId) -> Result<Vec<RawIssue>, StingrayError> {
        let list = json!([
            {"id": 1, "name": "Hardcoded secret", "details": "strings.xml"},
            {"id": 2, "name": "Cleartext traffic", "details": scan_id.as_str()}
        ]);
        Ok(serde_json::from_value(list).unwrap())
    }

    async fn get_summary(&self, _: &ScanId) -> Result<Value, StingrayError> {
        Ok(json!({"high": 1, "medium": 1}))
    }

    async fn download_report(&self, scan_id: &ScanId) -> Result<Vec<u8>, StingrayError> {
        Err(StingrayError::Report(format!("no pdf for {}", scan_id)))
    }
}

fn binary() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"PK\x03\x04").unwrap();
    file
}

fn config(binary: &Path, out: &Path, kinds: Vec<ReportKind>) -> RunConfig {
    RunConfig {
        binary: binary.to_path_buf(),
        profile: ProfileId(3),
        testcases: vec![TestCaseId(1), TestCaseId(2)],
        poll_interval: Duration::ZERO,
        max_attempts: 5,
        no_wait: false,
        report_kinds: kinds,
        output_dir: out.to_path_buf(),
        json_file: Some("merged".into()),
    }
}

#[tokio::test]
async fn test_legacy_run_polls_each_scan_to_completion() {
    let bin = binary();
    let out = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::new(vec![4, 3, 3, 1]));
    let sink = Arc::new(RecordingSink::new());

    let orchestrator = ScanOrchestrator::new(
        config(bin.path(), out.path(), vec![ReportKind::Standard, ReportKind::Grouping, ReportKind::Separate]),
        service.clone(),
        sink.clone(),
    );
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(*service.status_calls.lock().unwrap(), 8);
    assert_eq!(summary.sessions.len(), 2);
    assert!(summary.sessions.iter().all(|s| s.phase == ScanPhase::Succeeded));
    // "Hardcoded secret" merges across scans, "Cleartext traffic" differs per scan
    assert_eq!(summary.total_issues, 3);

    for name in [
        "stingray_scan_standard_report.json",
        "stingray_scan_grouping_report.json",
        "stingray_scan_report-testcase_1.json",
        "stingray_scan_report-testcase_2.json",
        "merged.json",
    ] {
        assert!(out.path().join(name).exists(), "missing {}", name);
    }

    let grouping: Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("stingray_scan_grouping_report.json")).unwrap())
            .unwrap();
    assert_eq!(grouping.as_array().unwrap().len(), 2);
    assert_eq!(grouping[1]["details"], json!(["100", "200"]));

    let events = sink.events();
    let completed = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::RunCompleted { .. }))
        .count();
    assert_eq!(sink.status_checks(), 8);
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn test_failed_scan_aborts_the_run() {
    let bin = binary();
    let out = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::new(vec![5, 3, 2]));
    let orchestrator = ScanOrchestrator::new(
        config(bin.path(), out.path(), vec![ReportKind::Standard]),
        service,
        Arc::new(RecordingSink::new()),
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, StingrayError::ScanFailed { phase: ScanPhase::Failed, .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(!out.path().join("stingray_scan_standard_report.json").exists());
}

#[tokio::test]
async fn test_unknown_status_code_is_fatal() {
    let bin = binary();
    let out = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::new(vec![4, 42]));
    let orchestrator = ScanOrchestrator::new(
        config(bin.path(), out.path(), vec![ReportKind::Standard]),
        service.clone(),
        Arc::new(RecordingSink::new()),
    );

    match orchestrator.run().await {
        Err(StingrayError::UnknownStatus { scan_id, raw }) => {
            assert_eq!(scan_id.as_str(), "100");
            assert_eq!(raw, "42");
        }
        other => panic!("expected unknown status, got {:?}", other.map(|s| s.total_issues)),
    }
    assert_eq!(*service.status_calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_cancellation_interrupts_unbounded_polling() {
    let bin = binary();
    let out = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    let mut service = ScriptedService::new(vec![3; 100]);
    service.cancel_after = Some((3, token.clone()));

    let orchestrator = ScanOrchestrator::new(
        config(bin.path(), out.path(), vec![ReportKind::Standard]),
        Arc::new(service),
        Arc::new(RecordingSink::new()),
    )
    .with_cancel_token(token);

    let err = orchestrator.run().await.unwrap_err();
    match &err {
        StingrayError::Cancelled { scan_id, last_phase } => {
            assert_eq!(scan_id.as_str(), "100");
            assert_eq!(last_phase, "running");
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 130);
}

#[tokio::test]
async fn test_read_retry_returns_last_rejected_value() {
    let counter = Mutex::new(0u32);
    let calls = &counter;
    let policy = RetryPolicy::new(3, Duration::ZERO);
    let status = with_read_retry("status", &policy, |code: &u16| *code == 200, move || async move {
        *calls.lock().unwrap() += 1;
        Ok::<u16, StingrayError>(503)
    })
    .await
    .unwrap();

    assert_eq!(status, 503);
    assert_eq!(*counter.lock().unwrap(), 3);
}
