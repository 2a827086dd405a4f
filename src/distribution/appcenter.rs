use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::errors::StingrayError;
use super::{fetch_bytes, fetch_json, http_client, save_download, scalar_text, DistributionResolver, VersionSelector};

pub const APPCENTER_URL: &str = "https://api.appcenter.ms/v0.1";
const TOKEN_HEADER: &str = "X-API-Token";

pub struct AppCenterResolver {
    client: Client,
    base_url: String,
    token: String,
    owner: String,
    app: String,
    release_id: Option<String>,
    version: VersionSelector,
    download_dir: PathBuf,
}

impl AppCenterResolver {
    pub fn new(
        token: String,
        owner: String,
        app: String,
        release_id: Option<String>,
        version: VersionSelector,
        download_dir: PathBuf,
    ) -> Result<Self, StingrayError> {
        Ok(Self {
            client: http_client()?,
            base_url: APPCENTER_URL.to_string(),
            token,
            owner,
            app,
            release_id,
            version,
            download_dir,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn releases_url(&self) -> String {
        format!("{}/apps/{}/{}/releases", self.base_url, self.owner, self.app)
    }

    /// The release to download: the pinned id, the release carrying the
    /// requested version, or `latest`.
    async fn release_id(&self) -> Result<String, StingrayError> {
        if let Some(id) = &self.release_id {
            return Ok(id.clone());
        }
        match &self.version {
            VersionSelector::Latest => Ok("latest".to_string()),
            VersionSelector::Exact(version) => {
                let releases = fetch_json(
                    &self.client,
                    &format!("{}?scope=tester", self.releases_url()),
                    TOKEN_HEADER,
                    &self.token,
                    "AppCenter - getting application releases",
                )
                .await?;
                find_release_id(&releases, version).ok_or_else(|| {
                    StingrayError::Distribution(format!(
                        "AppCenter - no release with version {} for {}/{}",
                        version, self.owner, self.app
                    ))
                })
            }
        }
    }
}

fn find_release_id(releases: &Value, version: &str) -> Option<String> {
    releases
        .as_array()?
        .iter()
        .find(|r| r.get("version").and_then(scalar_text).as_deref() == Some(version))
        .and_then(|r| r.get("id"))
        .and_then(scalar_text)
}

#[async_trait]
impl DistributionResolver for AppCenterResolver {
    fn name(&self) -> &'static str {
        "appcenter"
    }

    async fn resolve(&self) -> Result<PathBuf, StingrayError> {
        let release_id = self.release_id().await?;
        info!(owner = %self.owner, app = %self.app, release = %release_id, "AppCenter - Get information about application");
        let release = fetch_json(
            &self.client,
            &format!("{}/{}", self.releases_url(), release_id),
            TOKEN_HEADER,
            &self.token,
            "AppCenter - getting release information",
        )
        .await?;

        let download_url = release
            .get("download_url")
            .and_then(Value::as_str)
            .ok_or_else(|| StingrayError::Distribution("AppCenter - release carries no download_url".into()))?;
        let version = release.get("version").and_then(scalar_text).unwrap_or_else(|| release_id.clone());

        info!(app = %self.app, version = %version, "AppCenter - Start download application");
        let data = fetch_bytes(
            &self.client,
            download_url,
            TOKEN_HEADER,
            &self.token,
            "AppCenter - downloading application",
        )
        .await?;
        save_download(&self.download_dir, &self.app, &version, &data).await
    }
}
