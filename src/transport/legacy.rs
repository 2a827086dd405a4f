use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde_json::Value;
use tracing::{error, info};

use crate::errors::StingrayError;
use crate::models::{ProfileId, RawIssue, RawStatus, ScanId, TestCaseId};
use crate::pipeline::status::StatusVocabulary;
use super::rest::{created_id, file_part, RestClient};
use super::{issue_list, status_field, ScanTransport, ServiceEndpoint};

/// Legacy CI endpoint: one multipart call submits and starts a scan, and
/// statuses are integer codes.
pub struct LegacyTransport {
    rest: RestClient,
}

impl LegacyTransport {
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, StingrayError> {
        let rest = RestClient::new(
            &endpoint.url,
            "Access-token",
            endpoint.token.clone(),
            endpoint.retry.clone(),
        )?;
        Ok(Self { rest })
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }
}

#[async_trait]
impl ScanTransport for LegacyTransport {
    fn vocabulary(&self) -> StatusVocabulary {
        StatusVocabulary::Legacy
    }

    async fn submit(
        &self,
        binary: &Path,
        profile: ProfileId,
        testcase: TestCaseId,
    ) -> Result<ScanId, StingrayError> {
        let form = Form::new()
            .part("file", file_part(binary).await?)
            .text("profile_id", profile.to_string())
            .text("testcase_id", testcase.to_string());

        let response = self.rest.post_multipart("rest/scan/cd", form).await?;

        // The service answers a bad test case with 500 and a bad profile with 401.
        match response.status {
            500 => error!(testcase = %testcase, "Please check the correctness of the provided testcase id"),
            401 => error!(profile = %profile, "Please check the correctness of the provided profile id"),
            _ => {}
        }

        if response.status != 201 {
            return Err(StingrayError::Submission {
                status: Some(response.status),
                message: response.service_message(),
            });
        }
        let body: Value = response.json()?;

        let id = created_id(&body).ok_or_else(|| StingrayError::Submission {
            status: Some(response.status),
            message: format!("Response carries no scan id: {}", body),
        })?;
        info!(scan_id = %id, "Scan accepted by service");
        Ok(ScanId::from(id))
    }

    async fn get_status(&self, scan_id: &ScanId) -> Result<RawStatus, StingrayError> {
        let response = self
            .rest
            .get(&format!("rest/scanlist/{}", scan_id))
            .await?
            .error_for_status()?;
        let body: Value = response.json()?;
        Ok(status_field(&body, "status"))
    }

    async fn get_issues(&self, scan_id: &ScanId) -> Result<Vec<RawIssue>, StingrayError> {
        let response = self
            .rest
            .get(&format!("rest/scanresult/{}/issues", scan_id))
            .await?
            .error_for_status()?;
        issue_list(&response)
    }

    async fn get_summary(&self, scan_id: &ScanId) -> Result<Value, StingrayError> {
        let response = self
            .rest
            .get(&format!("rest/scanresult/{}/issuessummary", scan_id))
            .await?
            .error_for_status()?;
        response.json()
    }

    async fn download_report(&self, scan_id: &ScanId) -> Result<Vec<u8>, StingrayError> {
        Err(StingrayError::Report(format!(
            "PDF reports are not available from the legacy endpoint (scan {})",
            scan_id
        )))
    }
}
