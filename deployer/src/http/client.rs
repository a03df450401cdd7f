//! HTTP client for the artifact repository

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use url::Url;

use crate::deploy::fetch::{ArtifactCoordinates, ArtifactRepository};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::storage::settings::RepositorySettings;
use crate::utils::user_agent;

/// Downloads artifacts from a Nexus-style redirect endpoint
pub struct RepositoryClient {
    client: Client,
    base_url: Url,
    group_id: String,
    packaging: String,
    username: Option<String>,
    password: Option<SecretString>,
    require_success_status: bool,
}

impl RepositoryClient {
    /// Create a new repository client
    pub fn new(settings: &RepositorySettings) -> Result<Self, DeployError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            DeployError::Configuration(format!(
                "invalid artifact repository url {}: {}",
                settings.base_url, e
            ))
        })?;

        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| DeployError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            group_id: settings.group_id.clone(),
            packaging: settings.packaging.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            require_success_status: settings.require_success_status,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full download URL for a set of coordinates
    pub fn artifact_url(&self, coords: &ArtifactCoordinates) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().extend_pairs(coords.query());
        url
    }
}

#[async_trait]
impl ArtifactRepository for RepositoryClient {
    fn group_id(&self) -> &str {
        &self.group_id
    }

    fn packaging(&self) -> &str {
        &self.packaging
    }

    async fn download(
        &self,
        coords: &ArtifactCoordinates,
        dest: &File,
    ) -> Result<u64, DeployError> {
        let url = self.artifact_url(coords);
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(username) = &self.username {
            request = request.basic_auth(
                username,
                self.password.as_ref().map(|p| p.expose_secret().to_string()),
            );
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| DeployError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if self.require_success_status {
                let body = response.text().await.unwrap_or_default();
                error!("Artifact download failed: {} - {}", status, body);
                return Err(DeployError::Fetch(format!(
                    "repository returned {} for {}:{}",
                    status, coords.artifact_id, coords.version
                )));
            }
            warn!(
                "Repository returned {}, writing the response body anyway",
                status
            );
        }

        let mut out = dest
            .create()
            .await
            .map_err(|e| DeployError::Fetch(format!("{}: {}", dest.path().display(), e)))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DeployError::Fetch(e.to_string()))?
        {
            out.write_all(&chunk)
                .await
                .map_err(|e| DeployError::Fetch(format!("{}: {}", dest.path().display(), e)))?;
            written += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|e| DeployError::Fetch(format!("{}: {}", dest.path().display(), e)))?;

        Ok(written)
    }
}
