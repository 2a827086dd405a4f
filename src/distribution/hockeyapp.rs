use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::errors::StingrayError;
use super::{fetch_bytes, fetch_json, http_client, save_download, scalar_text, DistributionResolver, VersionSelector};

pub const HOCKEYAPP_URL: &str = "https://rink.hockeyapp.net/api/2";
const TOKEN_HEADER: &str = "X-HockeyAppToken";

pub struct HockeyAppResolver {
    client: Client,
    base_url: String,
    token: String,
    bundle_id: Option<String>,
    public_id: Option<String>,
    version: VersionSelector,
    download_dir: PathBuf,
}

impl HockeyAppResolver {
    pub fn new(
        token: String,
        bundle_id: Option<String>,
        public_id: Option<String>,
        version: VersionSelector,
        download_dir: PathBuf,
    ) -> Result<Self, StingrayError> {
        if bundle_id.is_none() && public_id.is_none() {
            return Err(StingrayError::Config(
                "HockeyApp needs a bundle id or a public id".to_string(),
            ));
        }
        Ok(Self {
            client: http_client()?,
            base_url: HOCKEYAPP_URL.to_string(),
            token,
            bundle_id,
            public_id,
            version,
            download_dir,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn public_id(&self) -> Result<String, StingrayError> {
        if let Some(id) = &self.public_id {
            return Ok(id.clone());
        }
        let bundle = self.bundle_id.as_deref().unwrap_or_default();
        info!(bundle, "HockeyApp - Get list of available applications");
        let apps = fetch_json(
            &self.client,
            &format!("{}/apps", self.base_url),
            TOKEN_HEADER,
            &self.token,
            "HockeyApp - getting application list",
        )
        .await?;
        find_public_id(&apps, bundle).ok_or_else(|| {
            StingrayError::Distribution(format!("HockeyApp - no application with bundle id {}", bundle))
        })
    }
}

/// Public identifier of the app whose bundle identifier matches.
fn find_public_id(apps: &Value, bundle: &str) -> Option<String> {
    apps.get("apps")?
        .as_array()?
        .iter()
        .find(|app| app.get("bundle_identifier").and_then(Value::as_str) == Some(bundle))
        .and_then(|app| app.get("public_identifier"))
        .and_then(scalar_text)
}

/// `latest` is the first entry of the service's version list.
fn select_version<'a>(versions: &'a Value, selector: &VersionSelector) -> Option<&'a Value> {
    let list = versions.get("app_versions")?.as_array()?;
    match selector {
        VersionSelector::Latest => list.first(),
        VersionSelector::Exact(wanted) => list
            .iter()
            .find(|v| v.get("version").and_then(scalar_text).as_deref() == Some(wanted.as_str())),
    }
}

/// Web download links point at `/apps/`; the API serves the apk under
/// `/api/2/apps/`.
fn api_download_url(download_url: &str) -> String {
    format!("{}?format=apk", download_url.replacen("/apps/", "/api/2/apps/", 1))
}

#[async_trait]
impl DistributionResolver for HockeyAppResolver {
    fn name(&self) -> &'static str {
        "hockeyapp"
    }

    async fn resolve(&self) -> Result<PathBuf, StingrayError> {
        let public_id = self.public_id().await?;
        info!(app = %public_id, "HockeyApp - Get all available versions of current application");
        let versions = fetch_json(
            &self.client,
            &format!("{}/apps/{}/app_versions", self.base_url, public_id),
            TOKEN_HEADER,
            &self.token,
            "HockeyApp - getting application versions info",
        )
        .await?;

        let entry = select_version(&versions, &self.version).ok_or_else(|| {
            StingrayError::Distribution(format!("HockeyApp - version {:?} not found for {}", self.version, public_id))
        })?;
        let version = entry.get("version").and_then(scalar_text).unwrap_or_else(|| "unknown".into());
        let download_url = entry
            .get("download_url")
            .and_then(Value::as_str)
            .ok_or_else(|| StingrayError::Distribution("HockeyApp - version carries no download_url".into()))?;

        info!(app = %public_id, version = %version, "HockeyApp - Start download application");
        let data = fetch_bytes(
            &self.client,
            &api_download_url(download_url),
            TOKEN_HEADER,
            &self.token,
            "HockeyApp - downloading application",
        )
        .await?;
        save_download(&self.download_dir, &public_id, &version, &data).await
    }
}
