use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::StingrayError;
use crate::models::{ProfileId, RawIssue, RawStatus, ScanId, TestCaseId};
use crate::pipeline::status::StatusVocabulary;
use super::rest::{created_id, file_part, RawResponse, RestClient};
use super::{issue_list, status_field, ScanTransport, ServiceEndpoint};

/// Autoscan type code for test-case driven scans.
const AUTO_SCAN_TYPE: u8 = 1;

#[derive(Debug, Clone)]
pub struct CurrentTransportConfig {
    pub company_id: String,
    pub architecture_id: String,
    /// `android` or `ios`.
    pub architecture_type: String,
}

/// Current REST API: upload, create an autoscan, then start it. Statuses
/// are named states.
pub struct CurrentTransport {
    rest: RestClient,
    config: CurrentTransportConfig,
}

impl CurrentTransport {
    pub fn new(endpoint: &ServiceEndpoint, config: CurrentTransportConfig) -> Result<Self, StingrayError> {
        let rest = RestClient::new(
            &rest_base_url(&endpoint.url),
            "Authorization",
            format!("Bearer {}", endpoint.token),
            endpoint.retry.clone(),
        )?;
        Ok(Self { rest, config })
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }

    async fn upload_application(&self, binary: &Path) -> Result<String, StingrayError> {
        info!(binary = %binary.display(), "Uploading application to server");
        let form = Form::new()
            .part("file", file_part(binary).await?)
            .text("architecture_type", self.config.architecture_type.clone());
        let response = self
            .rest
            .post_multipart(&format!("organizations/{}/applications/", self.config.company_id), form)
            .await?;
        let id = expect_created(&response, "uploading application")?;
        info!(application_id = %id, "Application uploaded successfully");
        Ok(id)
    }

    async fn create_auto_scan(
        &self,
        application_id: &str,
        profile: ProfileId,
        testcase: TestCaseId,
    ) -> Result<String, StingrayError> {
        let body = json!({
            "profile_id": profile.0,
            "application_id": application_id,
            "architecture_id": self.config.architecture_id,
            "test_case_id": testcase.0,
            "type": AUTO_SCAN_TYPE,
        });
        let response = self
            .rest
            .post_json(&format!("organizations/{}/dasts/", self.config.company_id), &body)
            .await?;
        let id = expect_created(&response, "creating autoscan")?;
        info!(scan_id = %id, "Autoscan created successfully");
        Ok(id)
    }

    async fn start_scan(&self, scan_id: &str) -> Result<(), StingrayError> {
        let response = self.rest.post_empty(&format!("dasts/{}/start/", scan_id)).await?;
        if response.status != 200 {
            return Err(StingrayError::Submission {
                status: Some(response.status),
                message: format!("Error while starting autoscan {}: {}", scan_id, response.text()),
            });
        }
        Ok(())
    }
}

/// Base URLs are accepted with or without the trailing `/rest`.
fn rest_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("rest") {
        trimmed.to_string()
    } else {
        format!("{}/rest", trimmed)
    }
}

fn expect_created(response: &RawResponse, action: &str) -> Result<String, StingrayError> {
    if response.status != 201 {
        return Err(StingrayError::Submission {
            status: Some(response.status),
            message: format!("Error while {}: {}", action, response.text()),
        });
    }
    let body: Value = response.json()?;
    created_id(&body).ok_or_else(|| StingrayError::Submission {
        status: Some(response.status),
        message: format!("Something went wrong while {}: {}", action, body),
    })
}

#[async_trait]
impl ScanTransport for CurrentTransport {
    fn vocabulary(&self) -> StatusVocabulary {
        StatusVocabulary::Current
    }

    async fn submit(
        &self,
        binary: &Path,
        profile: ProfileId,
        testcase: TestCaseId,
    ) -> Result<ScanId, StingrayError> {
        let application_id = self.upload_application(binary).await?;
        let scan_id = self.create_auto_scan(&application_id, profile, testcase).await?;
        self.start_scan(&scan_id).await?;
        Ok(ScanId::from(scan_id))
    }

    async fn get_status(&self, scan_id: &ScanId) -> Result<RawStatus, StingrayError> {
        let response = self.rest.get(&format!("dasts/{}/", scan_id)).await?.error_for_status()?;
        let body: Value = response.json()?;
        Ok(status_field(&body, "state"))
    }

    async fn get_issues(&self, scan_id: &ScanId) -> Result<Vec<RawIssue>, StingrayError> {
        let response = self
            .rest
            .get(&format!("dasts/{}/issues/", scan_id))
            .await?
            .error_for_status()?;
        issue_list(&response)
    }

    async fn get_summary(&self, scan_id: &ScanId) -> Result<Value, StingrayError> {
        let response = self
            .rest
            .get(&format!("dasts/{}/summary/", scan_id))
            .await?
            .error_for_status()?;
        response.json()
    }

    async fn download_report(&self, scan_id: &ScanId) -> Result<Vec<u8>, StingrayError> {
        let response = self.rest.get(&format!("dasts/{}/report/", scan_id)).await?;
        if response.status != 200 {
            return Err(StingrayError::Report(format!(
                "Report creating failed for scan {}: {}",
                scan_id,
                response.text()
            )));
        }
        Ok(response.body)
    }
}
