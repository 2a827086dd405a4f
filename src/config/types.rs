use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::state::ReportKind;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StingrayConfig {
    pub service: Option<ServiceConfig>,
    pub scan: Option<ScanSettings>,
    pub retry: Option<RetryConfig>,
    pub report: Option<ReportConfig>,
    pub distribution: Option<DistributionConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServiceConfig {
    pub url: Option<String>,
    pub api: Option<ApiGeneration>,
    pub token: Option<String>,
    pub company_id: Option<String>,
    pub architecture_id: Option<String>,
    pub architecture_type: Option<String>,
}

/// Which generation of the service API to talk to.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiGeneration {
    #[default]
    Legacy,
    Current,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScanSettings {
    pub profile: Option<u64>,
    pub testcases: Option<Vec<u64>>,
    pub poll_interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub no_wait: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    pub delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReportConfig {
    pub types: Option<Vec<ReportKind>>,
    pub output_dir: Option<PathBuf>,
    pub json_file: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DistributionSystem {
    #[default]
    File,
    #[value(name = "hockeyapp")]
    HockeyApp,
    #[value(name = "appcenter")]
    AppCenter,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DistributionConfig {
    #[serde(default)]
    pub system: DistributionSystem,
    pub file: Option<PathBuf>,
    pub hockeyapp: Option<HockeyAppConfig>,
    pub appcenter: Option<AppCenterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HockeyAppConfig {
    pub token: Option<String>,
    pub bundle_id: Option<String>,
    pub public_id: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppCenterConfig {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub app: Option<String>,
    pub release_id: Option<String>,
    pub version: Option<String>,
}

/// Drop duplicate test cases, keeping first-seen order.
pub fn dedup_testcases(testcases: &[u64]) -> Vec<u64> {
    let mut seen = Vec::with_capacity(testcases.len());
    for t in testcases {
        if !seen.contains(t) {
            seen.push(*t);
        }
    }
    seen
}
