//! Deployment target resolution

use std::fmt;

use secrecy::SecretString;
use tracing::{info, warn};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::storage::environment::{load_environment, profile_for};

/// Partition of the artifact repository to download from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryChannel {
    Snapshots,
    Releases,
}

impl RepositoryChannel {
    /// Channel for an environment. Unknown environments fall back to snapshots.
    pub fn for_environment(environment: &str) -> Self {
        match environment {
            "qa" | "staging" => RepositoryChannel::Snapshots,
            "prod" => RepositoryChannel::Releases,
            other => {
                warn!(
                    "Unknown environment '{}', downloading from the snapshots repository",
                    other
                );
                RepositoryChannel::Snapshots
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryChannel::Snapshots => "snapshots",
            RepositoryChannel::Releases => "releases",
        }
    }
}

impl fmt::Display for RepositoryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a product's revisions are stored and deployed in an environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub bucket: String,
    pub application: String,
    pub group: String,
    pub prefix: String,
}

impl DeploymentTarget {
    /// Derive application, group and storage prefix from product and environment
    pub fn derive(environment: &str, product: &str, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            application: format!("{}-app-{}", product, environment),
            group: format!("{}-group-{}", product, environment),
            prefix: format!("{}-folder-{}/", product, environment),
        }
    }
}

/// Credentials and region used to talk to AWS for one settings profile
#[derive(Debug, Clone)]
pub struct AwsProfile {
    /// Settings profile name
    pub name: String,
    pub region: String,
    /// `None` means the default credential chain
    pub credentials: Option<StaticCredentials>,
}

impl AwsProfile {
    /// Key for cached clients: profile, region and access key id, so a rotated
    /// key in the profile file never reuses a client built with the old one
    pub fn cache_key(&self) -> String {
        let identity = self
            .credentials
            .as_ref()
            .map(|c| c.access_key.as_str())
            .unwrap_or("default-chain");
        format!("{}/{}/{}", self.name, self.region, identity)
    }
}

#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key: String,
    pub secret_key: SecretString,
}

/// Everything a run needs to know about where it deploys
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub target: DeploymentTarget,
    pub channel: RepositoryChannel,
    pub profile: AwsProfile,
}

/// Maps (environment, product) to a deployment target, reading the environment
/// settings on every call
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    environment_dir: Dir,
    region: String,
}

impl ConfigResolver {
    pub fn new(environment_dir: Dir, region: impl Into<String>) -> Self {
        Self {
            environment_dir,
            region: region.into(),
        }
    }

    pub async fn resolve(
        &self,
        environment: &str,
        product: &str,
    ) -> Result<ResolvedConfig, DeployError> {
        if product.trim().is_empty() {
            return Err(DeployError::Configuration("product not set".to_string()));
        }

        let settings = load_environment(&self.environment_dir, environment).await?;
        if settings.aws.bucket_name.trim().is_empty() {
            return Err(DeployError::Configuration(format!(
                "bucket_name is empty in the {} settings",
                profile_for(environment)
            )));
        }

        let target =
            DeploymentTarget::derive(environment, product, settings.aws.bucket_name.clone());
        info!("Make sure the CodeDeploy application exists: {}", target.application);
        info!("Make sure the CodeDeploy deployment group exists: {}", target.group);
        info!("Make sure the storage folder exists: {}", target.prefix);
        info!("Make sure the bucket exists: {}", target.bucket);

        let credentials = settings
            .aws
            .static_credentials()
            .map(|(access_key, secret_key)| StaticCredentials {
                access_key,
                secret_key,
            });

        info!(
            "Preparing deployment for environment: {} and product: {}",
            environment, product
        );

        Ok(ResolvedConfig {
            target,
            channel: RepositoryChannel::for_environment(environment),
            profile: AwsProfile {
                name: profile_for(environment).to_string(),
                region: self.region.clone(),
                credentials,
            },
        })
    }
}
