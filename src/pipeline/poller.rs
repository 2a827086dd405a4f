use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::errors::StingrayError;
use crate::models::{RawStatus, ScanId, ScanPhase};
use super::events::{EventSink, ScanEvent};
use super::status::Classifier;

/// How many status queries a poll loop may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBound {
    /// Poll until the stage predicate holds, however long that takes.
    Unbounded,
    /// Give up after this many queries and report the last phase.
    MaxAttempts(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The stage predicate accepted `phase`.
    Reached { phase: ScanPhase, attempts: u32 },
    /// The attempt budget ran out while still waiting.
    Exhausted { last_phase: ScanPhase, attempts: u32 },
    /// The cancellation token fired.
    Cancelled { last_phase: Option<ScanPhase>, attempts: u32 },
}

impl PollOutcome {
    pub fn last_phase(&self) -> Option<ScanPhase> {
        match self {
            Self::Reached { phase, .. } => Some(*phase),
            Self::Exhausted { last_phase, .. } => Some(*last_phase),
            Self::Cancelled { last_phase, .. } => *last_phase,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Reached { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }
}

/// Drives a status query loop with a fixed sleep between queries.
pub struct ScanPoller {
    interval: Duration,
    cancel_token: CancellationToken,
    events: Arc<dyn EventSink>,
}

impl ScanPoller {
    pub fn new(interval: Duration, events: Arc<dyn EventSink>) -> Self {
        Self {
            interval,
            cancel_token: CancellationToken::new(),
            events,
        }
    }

    /// Share an external cancel token so callers can interrupt a wait.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Query `get_status` until `is_done` accepts the classified phase, the
    /// bound is exhausted, or the token is cancelled.
    ///
    /// Errors from `get_status` are returned unchanged; transport retries
    /// happen below this layer. A status the classifier cannot place is
    /// fatal, as continuing on it could loop forever.
    pub async fn poll<F, Fut, D>(
        &self,
        scan_id: &ScanId,
        mut get_status: F,
        classify: Classifier,
        is_done: D,
        bound: PollBound,
    ) -> Result<PollOutcome, StingrayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawStatus, StingrayError>>,
        D: Fn(ScanPhase) -> bool,
    {
        let mut attempts: u32 = 0;
        let mut last_phase: Option<ScanPhase> = None;

        loop {
            if self.cancel_token.is_cancelled() {
                return Ok(PollOutcome::Cancelled { last_phase, attempts });
            }

            attempts += 1;
            let raw = get_status().await?;
            let phase = classify(&raw);
            self.events.emit(ScanEvent::StatusChecked {
                scan_id: scan_id.clone(),
                phase,
                attempt: attempts,
            });

            if phase == ScanPhase::Unknown {
                return Err(StingrayError::UnknownStatus {
                    scan_id: scan_id.clone(),
                    raw: raw.to_string(),
                });
            }
            last_phase = Some(phase);

            if is_done(phase) {
                return Ok(PollOutcome::Reached { phase, attempts });
            }

            if let PollBound::MaxAttempts(max) = bound {
                if attempts >= max {
                    return Ok(PollOutcome::Exhausted { last_phase: phase, attempts });
                }
            }

            self.events.emit(ScanEvent::Waiting {
                scan_id: scan_id.clone(),
                delay_secs: self.interval.as_secs(),
            });
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    return Ok(PollOutcome::Cancelled { last_phase, attempts });
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
