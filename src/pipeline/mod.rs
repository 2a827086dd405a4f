pub mod aggregator;
pub mod events;
pub mod orchestrator;
pub mod poller;
pub mod session;
pub mod state;
pub mod status;

pub use aggregator::{merge, MergePolicy, ResultAggregator};
pub use events::{EventSink, RecordingSink, ScanEvent, TracingSink};
pub use orchestrator::ScanOrchestrator;
pub use poller::{PollBound, PollOutcome, ScanPoller};
pub use session::ScanSession;
pub use state::{PollStage, ReportKind, RunConfig, RunSummary, SessionOutcome, SessionState};
pub use status::{classify_current, classify_legacy, StatusVocabulary};
