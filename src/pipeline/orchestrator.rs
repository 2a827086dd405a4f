use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::errors::StingrayError;
use crate::models::{Issue, ScanId, ScanPhase};
use crate::reporting::{aggregated_report_name, separate_report_name, write_json_report, write_pdf_report};
use crate::transport::ScanTransport;
use super::aggregator::{MergePolicy, ResultAggregator};
use super::events::{EventSink, ScanEvent};
use super::poller::ScanPoller;
use super::session::ScanSession;
use super::state::{ReportKind, RunConfig, RunSummary, SessionOutcome};
use super::status::StatusVocabulary;

/// Runs one scan session per test case, strictly one after another, and
/// writes the requested reports once every session has finished.
pub struct ScanOrchestrator {
    config: RunConfig,
    transport: Arc<dyn ScanTransport>,
    events: Arc<dyn EventSink>,
    cancel_token: CancellationToken,
}

impl ScanOrchestrator {
    pub fn new(config: RunConfig, transport: Arc<dyn ScanTransport>, events: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            transport,
            events,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Replace the orchestrator's cancel token with an external one, e.g. one
    /// wired to Ctrl-C.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn emit(&self, event: ScanEvent) {
        self.events.emit(event);
    }

    fn warn(&self, message: impl Into<String>) {
        self.emit(ScanEvent::Warning { message: message.into() });
    }

    /// Aggregators needed for the requested reports. The json file output
    /// always uses the standard merge.
    fn aggregators(&self, kinds: &[ReportKind]) -> Vec<ResultAggregator> {
        let mut policies = Vec::new();
        for kind in kinds {
            match kind {
                ReportKind::Standard => policies.push(MergePolicy::Standard),
                ReportKind::Grouping => policies.push(MergePolicy::Grouping),
                ReportKind::Separate => {}
            }
        }
        if self.config.json_file.is_some() && !policies.contains(&MergePolicy::Standard) {
            policies.push(MergePolicy::Standard);
        }
        policies.into_iter().map(ResultAggregator::new).collect()
    }

    pub async fn run(&self) -> Result<RunSummary, StingrayError> {
        let started_at = Utc::now();
        let config = &self.config;
        if config.testcases.is_empty() {
            return Err(StingrayError::Config("At least one test case is required".into()));
        }

        self.emit(ScanEvent::RunStarted {
            binary: config.binary.clone(),
            testcases: config.testcases.clone(),
        });
        tokio::fs::create_dir_all(&config.output_dir).await?;

        let kinds = config.effective_report_kinds();
        let mut aggregators = self.aggregators(&kinds);
        let poller = ScanPoller::new(config.poll_interval, self.events.clone())
            .with_cancel_token(self.cancel_token.clone());
        let vocabulary = self.transport.vocabulary();

        let mut sessions = Vec::with_capacity(config.testcases.len());
        let mut reports: Vec<PathBuf> = Vec::new();
        let mut total_raw = 0usize;

        for &testcase in &config.testcases {
            if self.cancel_token.is_cancelled() {
                return Err(StingrayError::Cancelled {
                    scan_id: ScanId::from(""),
                    last_phase: "not submitted".to_string(),
                });
            }
            self.emit(ScanEvent::TestCaseStarted { testcase });

            let mut session = ScanSession::new(self.transport.as_ref(), &poller, self.events.clone(), testcase);
            let scan_id = session.submit(&config.binary, config.profile).await?;

            if config.no_wait {
                session.mark_reported();
                sessions.push(SessionOutcome {
                    testcase,
                    scan_id,
                    phase: ScanPhase::Submitted,
                    issues: 0,
                });
                continue;
            }

            let phase = session.await_terminal(config.max_attempts).await?;

            if vocabulary == StatusVocabulary::Current {
                let pdf = session.download_report().await?;
                let path = write_pdf_report(&config.output_dir, &scan_id, &pdf).await?;
                self.emit(ScanEvent::ReportWritten {
                    kind: "pdf".to_string(),
                    path: path.clone(),
                });
                reports.push(path);
            }

            let issues = session.fetch_issues().await?;

            match vocabulary {
                StatusVocabulary::Legacy => {
                    session.fetch_summary().await?;
                }
                StatusVocabulary::Current => {
                    if let Err(e) = session.fetch_summary().await {
                        self.warn(format!("Vulnerability summary unavailable: {}", e));
                    }
                }
            }

            if kinds.contains(&ReportKind::Separate) {
                let path = config.output_dir.join(separate_report_name(testcase));
                write_json_report(&path, &issues).await?;
                self.emit(ScanEvent::ReportWritten {
                    kind: ReportKind::Separate.to_string(),
                    path: path.clone(),
                });
                reports.push(path);
            }

            let count = issues.len();
            total_raw += count;
            for aggregator in aggregators.iter_mut() {
                aggregator.add_scan(issues.iter().cloned());
            }

            session.mark_reported();
            self.emit(ScanEvent::TestCaseCompleted {
                testcase,
                scan_id: scan_id.clone(),
                issues: count,
            });
            sessions.push(SessionOutcome {
                testcase,
                scan_id,
                phase,
                issues: count,
            });
        }

        if config.no_wait {
            self.emit(ScanEvent::RunCompleted {
                total_issues: 0,
                reports: 0,
            });
            return Ok(RunSummary {
                started_at,
                finished_at: Utc::now(),
                sessions,
                total_issues: 0,
                reports,
            });
        }

        if total_raw == 0 {
            self.warn("There is no issue data for the report");
        }

        let mut total_issues = total_raw;
        for aggregator in &aggregators {
            let policy = aggregator.policy();
            let requested = kinds.iter().any(|kind| report_policy(*kind) == Some(policy));
            if !requested {
                continue;
            }
            let path = config.output_dir.join(aggregated_report_name(policy));
            write_json_report(&path, aggregator.issues()).await?;
            self.emit(ScanEvent::ReportWritten {
                kind: policy_name(policy).to_string(),
                path: path.clone(),
            });
            reports.push(path);
            if policy == MergePolicy::Standard {
                total_issues = aggregator.len();
            }
        }

        if let Some(path) = config.json_file_path() {
            let standard: &[Issue] = aggregators
                .iter()
                .find(|a| a.policy() == MergePolicy::Standard)
                .map(|a| a.issues())
                .unwrap_or(&[]);
            write_json_report(&path, standard).await?;
            self.emit(ScanEvent::ReportWritten {
                kind: "json".to_string(),
                path: path.clone(),
            });
            reports.push(path);
        }

        self.emit(ScanEvent::RunCompleted {
            total_issues,
            reports: reports.len(),
        });

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            sessions,
            total_issues,
            reports,
        })
    }
}

fn report_policy(kind: ReportKind) -> Option<MergePolicy> {
    match kind {
        ReportKind::Standard => Some(MergePolicy::Standard),
        ReportKind::Grouping => Some(MergePolicy::Grouping),
        ReportKind::Separate => None,
    }
}

fn policy_name(policy: MergePolicy) -> &'static str {
    match policy {
        MergePolicy::Standard => "standard",
        MergePolicy::Grouping => "grouping",
    }
}
