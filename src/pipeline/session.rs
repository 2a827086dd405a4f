use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::StingrayError;
use crate::models::{Issue, ProfileId, ScanId, ScanPhase, TestCaseId};
use crate::transport::ScanTransport;
use super::events::{EventSink, ScanEvent};
use super::poller::{PollBound, PollOutcome, ScanPoller};
use super::state::{PollStage, SessionState};
use super::status::StatusVocabulary;

/// One submit / poll / fetch cycle for a single test case.
///
/// Owned by the orchestration loop that created it and dropped once its
/// issues have been handed to the aggregators.
pub struct ScanSession<'a> {
    transport: &'a dyn ScanTransport,
    poller: &'a ScanPoller,
    events: Arc<dyn EventSink>,
    testcase: TestCaseId,
    state: SessionState,
    scan_id: Option<ScanId>,
    phase: Option<ScanPhase>,
}

impl<'a> ScanSession<'a> {
    pub fn new(
        transport: &'a dyn ScanTransport,
        poller: &'a ScanPoller,
        events: Arc<dyn EventSink>,
        testcase: TestCaseId,
    ) -> Self {
        Self {
            transport,
            poller,
            events,
            testcase,
            state: SessionState::Created,
            scan_id: None,
            phase: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn testcase(&self) -> TestCaseId {
        self.testcase
    }

    pub fn scan_id(&self) -> Option<&ScanId> {
        self.scan_id.as_ref()
    }

    /// Last phase observed by the poller, if any.
    pub fn phase(&self) -> Option<ScanPhase> {
        self.phase
    }

    fn fail<T>(&mut self, err: StingrayError) -> Result<T, StingrayError> {
        self.state = SessionState::Failed;
        Err(err)
    }

    fn require_scan_id(&self) -> Result<ScanId, StingrayError> {
        self.scan_id
            .clone()
            .ok_or_else(|| StingrayError::Submission {
                status: None,
                message: format!("Test case {} has not been submitted", self.testcase),
            })
    }

    /// Submit the binary for this session's test case. Not retried: a
    /// missing binary or a rejected submission ends the run.
    pub async fn submit(&mut self, binary: &Path, profile: ProfileId) -> Result<ScanId, StingrayError> {
        if !binary.is_file() {
            return self.fail(StingrayError::BinaryNotFound(binary.display().to_string()));
        }

        match self.transport.submit(binary, profile, self.testcase).await {
            Ok(scan_id) => {
                self.events.emit(ScanEvent::Submitted {
                    testcase: self.testcase,
                    scan_id: scan_id.clone(),
                });
                self.scan_id = Some(scan_id.clone());
                self.phase = Some(ScanPhase::Submitted);
                self.state = SessionState::Submitted;
                Ok(scan_id)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Wait for the scan to finish. Legacy scans are polled without bound
    /// until a terminal phase; current scans go through two bounded stages
    /// of at most `max_attempts` status checks each.
    ///
    /// Returns `Succeeded`; every other ending is an error.
    pub async fn await_terminal(&mut self, max_attempts: u32) -> Result<ScanPhase, StingrayError> {
        let scan_id = self.require_scan_id()?;
        match self.transport.vocabulary() {
            StatusVocabulary::Legacy => {
                let phase = self.run_stage(&scan_id, PollStage::UntilTerminal, PollBound::Unbounded).await?;
                self.expect_success(&scan_id, phase)
            }
            StatusVocabulary::Current => {
                let bound = PollBound::MaxAttempts(max_attempts);
                let started = self.run_stage(&scan_id, PollStage::UntilStarted, bound).await?;
                match started {
                    ScanPhase::Running | ScanPhase::WaitingAnalysis | ScanPhase::Succeeded => {}
                    other => {
                        return self.fail(StingrayError::UnexpectedPhase {
                            scan_id,
                            actual: other,
                            expected: "running, waiting-analysis or succeeded".to_string(),
                        });
                    }
                }
                let finished = self.run_stage(&scan_id, PollStage::UntilFinished, bound).await?;
                self.expect_success(&scan_id, finished)
            }
        }
    }

    fn expect_success(&mut self, scan_id: &ScanId, phase: ScanPhase) -> Result<ScanPhase, StingrayError> {
        if phase == ScanPhase::Succeeded {
            Ok(phase)
        } else {
            self.fail(StingrayError::ScanFailed {
                scan_id: scan_id.clone(),
                phase,
            })
        }
    }

    async fn run_stage(
        &mut self,
        scan_id: &ScanId,
        stage: PollStage,
        bound: PollBound,
    ) -> Result<ScanPhase, StingrayError> {
        self.state = SessionState::Polling(stage);
        let transport = self.transport;
        let result = self
            .poller
            .poll(
                scan_id,
                || transport.get_status(scan_id),
                transport.vocabulary().classifier(),
                |phase| stage.is_done(phase),
                bound,
            )
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e),
        };
        if let Some(phase) = outcome.last_phase() {
            self.phase = Some(phase);
        }

        match outcome {
            PollOutcome::Reached { phase, attempts } => {
                self.events.emit(ScanEvent::StageCompleted {
                    scan_id: scan_id.clone(),
                    stage,
                    phase,
                    attempts,
                });
                Ok(phase)
            }
            PollOutcome::Exhausted { last_phase, attempts } => self.fail(StingrayError::PollingExhausted {
                scan_id: scan_id.clone(),
                last_phase,
                attempts,
            }),
            PollOutcome::Cancelled { last_phase, .. } => self.fail(StingrayError::Cancelled {
                scan_id: scan_id.clone(),
                last_phase: last_phase.map(|p| p.to_string()).unwrap_or_else(|| "none".to_string()),
            }),
        }
    }

    /// Fetch the scan's findings, tagged with this test case and scan id.
    pub async fn fetch_issues(&mut self) -> Result<Vec<Issue>, StingrayError> {
        let scan_id = self.require_scan_id()?;
        let raw = match self.transport.get_issues(&scan_id).await {
            Ok(raw) => raw,
            Err(e) => return self.fail(e),
        };
        self.events.emit(ScanEvent::IssuesFetched {
            scan_id: scan_id.clone(),
            count: raw.len(),
        });
        self.state = SessionState::ResultsFetched;
        Ok(raw
            .into_iter()
            .map(|issue| Issue::from_raw(issue, self.testcase, &scan_id))
            .collect())
    }

    /// Fetch the vulnerability summary. An empty summary counts as missing.
    /// Independent of issue fetching and does not change session state.
    pub async fn fetch_summary(&self) -> Result<Value, StingrayError> {
        let scan_id = self.require_scan_id()?;
        let summary = self
            .transport
            .get_summary(&scan_id)
            .await
            .map_err(|e| StingrayError::Summary {
                scan_id: scan_id.clone(),
                message: e.to_string(),
            })?;

        let empty = match &summary {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            return Err(StingrayError::Summary {
                scan_id,
                message: "service returned an empty summary".to_string(),
            });
        }

        self.events.emit(ScanEvent::SummaryFetched {
            scan_id,
            summary: summary.clone(),
        });
        Ok(summary)
    }

    pub async fn download_report(&self) -> Result<Vec<u8>, StingrayError> {
        let scan_id = self.require_scan_id()?;
        self.transport.download_report(&scan_id).await
    }

    /// Issues were handed over; the session is finished.
    pub fn mark_reported(&mut self) {
        self.state = SessionState::Reported;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawIssue, RawStatus};
    use crate::pipeline::events::RecordingSink;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedTransport {
        vocabulary: StatusVocabulary,
        statuses: Mutex<VecDeque<RawStatus>>,
        summary: Value,
    }

    impl ScriptedTransport {
        fn new(vocabulary: StatusVocabulary, statuses: Vec<RawStatus>) -> Self {
            Self {
                vocabulary,
                statuses: Mutex::new(statuses.into()),
                summary: json!({"high": 1}),
            }
        }
    }

    #[async_trait]
    impl ScanTransport for ScriptedTransport {
        fn vocabulary(&self) -> StatusVocabulary {
            self.vocabulary
        }

        async fn submit(&self, _: &Path, _: ProfileId, testcase: TestCaseId) -> Result<ScanId, StingrayError> {
            Ok(ScanId::from(format!("scan-{}", testcase)))
        }

        async fn get_status(&self, _: &ScanId) -> Result<RawStatus, StingrayError> {
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| StingrayError::Network("no more statuses".into()))
        }

        async fn get_issues(&self, _: &ScanId) -> Result<Vec<RawIssue>, StingrayError> {
            Ok(vec![serde_json::from_value(json!({"id": 1, "name": "A", "details": "x"})).unwrap()])
        }

        async fn get_summary(&self, _: &ScanId) -> Result<Value, StingrayError> {
            Ok(self.summary.clone())
        }

        async fn download_report(&self, _: &ScanId) -> Result<Vec<u8>, StingrayError> {
            Ok(b"%PDF-1.4".to_vec())
        }
    }

    fn binary() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"apk").unwrap();
        file
    }

    fn poller(sink: Arc<RecordingSink>) -> ScanPoller {
        ScanPoller::new(Duration::ZERO, sink)
    }

    fn named(states: &[&str]) -> Vec<RawStatus> {
        states.iter().map(|s| RawStatus::Named(s.to_string())).collect()
    }

    #[tokio::test]
    async fn test_missing_binary_fails_before_submission() {
        let transport = ScriptedTransport::new(StatusVocabulary::Legacy, vec![]);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink, TestCaseId(1));

        let err = session.submit(Path::new("/nonexistent/app.apk"), ProfileId(1)).await.unwrap_err();
        assert!(matches!(err, StingrayError::BinaryNotFound(_)));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.scan_id().is_none());
    }

    #[tokio::test]
    async fn test_legacy_lifecycle() {
        let transport = ScriptedTransport::new(
            StatusVocabulary::Legacy,
            vec![RawStatus::Code(4), RawStatus::Code(3), RawStatus::Code(3), RawStatus::Code(1)],
        );
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink.clone(), TestCaseId(7));
        let file = binary();

        let scan_id = session.submit(file.path(), ProfileId(1)).await.unwrap();
        assert_eq!(scan_id.as_str(), "scan-7");
        assert_eq!(session.state(), SessionState::Submitted);

        let phase = session.await_terminal(3).await.unwrap();
        assert_eq!(phase, ScanPhase::Succeeded);
        assert_eq!(sink.status_checks(), 4);

        let issues = session.fetch_issues().await.unwrap();
        assert_eq!(session.state(), SessionState::ResultsFetched);
        assert_eq!(issues[0].identifiers, vec!["7-1".to_string()]);
        assert_eq!(issues[0].origin_scan_ids, vec![ScanId::from("scan-7")]);

        session.mark_reported();
        assert_eq!(session.state(), SessionState::Reported);
    }

    #[tokio::test]
    async fn test_legacy_failed_scan_is_error() {
        let transport = ScriptedTransport::new(StatusVocabulary::Legacy, vec![RawStatus::Code(3), RawStatus::Code(2)]);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink, TestCaseId(1));
        let file = binary();
        session.submit(file.path(), ProfileId(1)).await.unwrap();

        let err = session.await_terminal(3).await.unwrap_err();
        assert!(matches!(err, StingrayError::ScanFailed { phase: ScanPhase::Failed, .. }));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.phase(), Some(ScanPhase::Failed));
    }

    #[tokio::test]
    async fn test_current_two_stage_lifecycle() {
        let transport = ScriptedTransport::new(
            StatusVocabulary::Current,
            named(&["created", "starting", "started", "analyzing", "analyzing", "success"]),
        );
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink.clone(), TestCaseId(2));
        let file = binary();
        session.submit(file.path(), ProfileId(1)).await.unwrap();

        assert_eq!(session.await_terminal(10).await.unwrap(), ScanPhase::Succeeded);
        assert_eq!(sink.status_checks(), 6);

        let stages: Vec<PollStage> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ScanEvent::StageCompleted { stage, .. } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![PollStage::UntilStarted, PollStage::UntilFinished]);
    }

    #[tokio::test]
    async fn test_current_stage_exhaustion_is_error() {
        let transport = ScriptedTransport::new(StatusVocabulary::Current, named(&["created"; 5]));
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink.clone(), TestCaseId(2));
        let file = binary();
        session.submit(file.path(), ProfileId(1)).await.unwrap();

        let err = session.await_terminal(3).await.unwrap_err();
        match err {
            StingrayError::PollingExhausted { last_phase, attempts, .. } => {
                assert_eq!(last_phase, ScanPhase::Submitted);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(sink.status_checks(), 3);
    }

    #[tokio::test]
    async fn test_current_error_state_before_start_is_unexpected() {
        let transport = ScriptedTransport::new(StatusVocabulary::Current, named(&["created", "error"]));
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink, TestCaseId(2));
        let file = binary();
        session.submit(file.path(), ProfileId(1)).await.unwrap();

        assert!(matches!(
            session.await_terminal(5).await,
            Err(StingrayError::UnexpectedPhase { actual: ScanPhase::Failed, .. })
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_unknown_state_is_fatal() {
        let transport = ScriptedTransport::new(StatusVocabulary::Current, named(&["created", "exploded"]));
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink, TestCaseId(2));
        let file = binary();
        session.submit(file.path(), ProfileId(1)).await.unwrap();

        assert!(matches!(
            session.await_terminal(5).await,
            Err(StingrayError::UnknownStatus { .. })
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_empty_summary_is_error() {
        let mut transport = ScriptedTransport::new(StatusVocabulary::Legacy, vec![]);
        transport.summary = json!({});
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink, TestCaseId(1));
        let file = binary();
        session.submit(file.path(), ProfileId(1)).await.unwrap();

        assert!(matches!(session.fetch_summary().await, Err(StingrayError::Summary { .. })));
    }

    #[tokio::test]
    async fn test_poll_before_submit_is_rejected() {
        let transport = ScriptedTransport::new(StatusVocabulary::Legacy, vec![RawStatus::Code(1)]);
        let sink = Arc::new(RecordingSink::new());
        let poller = poller(sink.clone());
        let mut session = ScanSession::new(&transport, &poller, sink, TestCaseId(1));
        assert!(session.await_terminal(1).await.is_err());
    }
}
