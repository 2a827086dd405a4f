pub mod rest;
pub mod legacy;
pub mod current;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{RetryPolicy, StingrayError};
use crate::models::{ProfileId, RawIssue, RawStatus, ScanId, TestCaseId};
use crate::pipeline::status::StatusVocabulary;

pub use current::{CurrentTransport, CurrentTransportConfig};
pub use legacy::LegacyTransport;
pub use rest::{RawResponse, RestClient};

/// The remote scan service, as seen by a scan session.
#[async_trait]
pub trait ScanTransport: Send + Sync {
    /// Status vocabulary this API generation speaks.
    fn vocabulary(&self) -> StatusVocabulary;

    /// Upload `binary` and start a scan of `testcase` under `profile`.
    async fn submit(
        &self,
        binary: &Path,
        profile: ProfileId,
        testcase: TestCaseId,
    ) -> Result<ScanId, StingrayError>;

    async fn get_status(&self, scan_id: &ScanId) -> Result<RawStatus, StingrayError>;

    async fn get_issues(&self, scan_id: &ScanId) -> Result<Vec<RawIssue>, StingrayError>;

    async fn get_summary(&self, scan_id: &ScanId) -> Result<Value, StingrayError>;

    /// PDF report bytes for a finished scan.
    async fn download_report(&self, scan_id: &ScanId) -> Result<Vec<u8>, StingrayError>;
}

/// Connection settings shared by both transports.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub url: String,
    pub token: String,
    pub retry: RetryPolicy,
}

/// Pull a status value out of a status payload. A missing or non-scalar
/// field yields code 0, which no vocabulary recognizes.
pub(crate) fn status_field(body: &Value, field: &str) -> RawStatus {
    body.get(field)
        .cloned()
        .and_then(|v| serde_json::from_value::<RawStatus>(v).ok())
        .unwrap_or(RawStatus::Code(0))
}

/// Decode an issue listing, accepting either a bare array or an object
/// wrapping it under `results`.
pub(crate) fn issue_list(response: &RawResponse) -> Result<Vec<RawIssue>, StingrayError> {
    let body: Value = response.json()?;
    let list = match body {
        Value::Object(mut map) if map.contains_key("results") => map.remove("results").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(list).map_err(|e| StingrayError::Decode {
        url: response.url.clone(),
        status: response.status,
        reason: format!("unexpected issue list: {}", e),
    })
}
