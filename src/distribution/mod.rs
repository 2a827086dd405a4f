//! Where the binary to scan comes from: a local file, or a release pulled
//! from a distribution service into `downloaded_apps/`.

pub mod appcenter;
pub mod file;
pub mod hockeyapp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::errors::StingrayError;

pub use appcenter::AppCenterResolver;
pub use file::FileResolver;
pub use hockeyapp::HockeyAppResolver;

pub const DOWNLOAD_DIR: &str = "downloaded_apps";

#[async_trait]
pub trait DistributionResolver: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    /// Produce a local path to the binary.
    async fn resolve(&self) -> Result<PathBuf, StingrayError>;
}

/// Which release to fetch when the caller does not pin one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Exact(String),
}

impl VersionSelector {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("latest") => Self::Latest,
            Some(v) => Self::Exact(v.to_string()),
        }
    }
}

pub(crate) fn http_client() -> Result<Client, StingrayError> {
    Client::builder()
        .user_agent(concat!("stingray-scan/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StingrayError::Distribution(format!("Failed to build HTTP client: {}", e)))
}

/// GET `url` with a token header; anything but 200 is a distribution error.
pub(crate) async fn fetch_bytes(
    client: &Client,
    url: &str,
    header: &'static str,
    token: &str,
    what: &str,
) -> Result<Vec<u8>, StingrayError> {
    let response = client
        .get(url)
        .header(header, token)
        .send()
        .await
        .map_err(|e| StingrayError::Distribution(format!("{}: request failed: {}", what, e)))?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(StingrayError::Distribution(format!(
            "{}: request returned status code {}",
            what, status
        )));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| StingrayError::Distribution(format!("{}: failed to read body: {}", what, e)))?;
    Ok(body.to_vec())
}

pub(crate) async fn fetch_json(
    client: &Client,
    url: &str,
    header: &'static str,
    token: &str,
    what: &str,
) -> Result<Value, StingrayError> {
    let bytes = fetch_bytes(client, url, header, token, what).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| StingrayError::Distribution(format!("{}: invalid JSON: {}", what, e)))
}

/// Write a downloaded binary as `{dir}/{app}-{version}.apk`.
pub(crate) async fn save_download(
    dir: &Path,
    app: &str,
    version: &str,
    data: &[u8],
) -> Result<PathBuf, StingrayError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}-{}.apk", app, version));
    tokio::fs::write(&path, data).await?;
    info!(path = %path.display(), bytes = data.len(), "Download application successfully completed");
    Ok(path)
}

/// Render a JSON scalar the way it appears in file names and URLs.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
