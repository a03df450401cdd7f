//! Revision registration and deployment against CodeDeploy

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_codedeploy::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_codedeploy::error::DisplayErrorContext;
use aws_sdk_codedeploy::types::{self, RevisionLocationType, S3Location};
use aws_sdk_codedeploy::Client;
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::deploy::target::AwsProfile;
use crate::errors::DeployError;
use crate::models::revision::{BundleType, RevisionLocation};

/// Register a new application revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRevision {
    pub application: String,
    pub description: String,
    pub location: RevisionLocation,
}

/// Deploy a registered revision to a deployment group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeployment {
    pub application: String,
    pub group: String,
    pub description: String,
    pub location: RevisionLocation,
}

/// Deployment orchestrator. Both calls return once the request is acknowledged;
/// the rollout itself is not followed.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn register_revision(
        &self,
        profile: &AwsProfile,
        request: &RegisterRevision,
    ) -> Result<(), DeployError>;

    /// Returns the deployment id
    async fn create_deployment(
        &self,
        profile: &AwsProfile,
        request: &CreateDeployment,
    ) -> Result<String, DeployError>;
}

/// CodeDeploy client, one per profile credentials, built on first use
pub struct CodeDeployOrchestrator {
    clients: Mutex<HashMap<String, Client>>,
}

impl CodeDeployOrchestrator {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, profile: &AwsProfile) -> Client {
        let mut clients = self.clients.lock().await;
        let key = profile.cache_key();
        if let Some(client) = clients.get(&key) {
            return client.clone();
        }

        debug!("Creating CodeDeploy client for profile {}", profile.name);
        let client = build_client(profile).await;
        clients.insert(key, client.clone());
        client
    }
}

impl Default for CodeDeployOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

async fn build_client(profile: &AwsProfile) -> Client {
    let region = Region::new(profile.region.clone());

    match &profile.credentials {
        Some(credentials) => {
            let credentials = Credentials::new(
                credentials.access_key.clone(),
                credentials.secret_key.expose_secret().to_string(),
                None,
                None,
                "environment-settings",
            );
            let config = aws_sdk_codedeploy::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(credentials)
                .build();
            Client::from_conf(config)
        }
        None => {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            Client::new(&shared)
        }
    }
}

fn sdk_revision(location: &RevisionLocation) -> types::RevisionLocation {
    let bundle_type = match location.bundle_type {
        BundleType::Zip => types::BundleType::Zip,
    };
    let s3 = S3Location::builder()
        .bucket(&location.bucket)
        .key(&location.key)
        .bundle_type(bundle_type)
        .build();

    types::RevisionLocation::builder()
        .revision_type(RevisionLocationType::S3)
        .s3_location(s3)
        .build()
}

#[async_trait]
impl Orchestrator for CodeDeployOrchestrator {
    async fn register_revision(
        &self,
        profile: &AwsProfile,
        request: &RegisterRevision,
    ) -> Result<(), DeployError> {
        let client = self.client(profile).await;
        client
            .register_application_revision()
            .application_name(&request.application)
            .description(&request.description)
            .revision(sdk_revision(&request.location))
            .send()
            .await
            .map_err(|e| DeployError::Registration(DisplayErrorContext(&e).to_string()))?;

        info!(
            "New revision registered for {}: {}",
            request.application, request.location.key
        );
        Ok(())
    }

    async fn create_deployment(
        &self,
        profile: &AwsProfile,
        request: &CreateDeployment,
    ) -> Result<String, DeployError> {
        let client = self.client(profile).await;
        let output = client
            .create_deployment()
            .application_name(&request.application)
            .deployment_group_name(&request.group)
            .description(&request.description)
            .revision(sdk_revision(&request.location))
            .send()
            .await
            .map_err(|e| DeployError::Deployment(DisplayErrorContext(&e).to_string()))?;

        let deployment_id = output.deployment_id().unwrap_or_default().to_string();
        info!(
            "New revision deployment started: {} ({} -> {})",
            deployment_id, request.application, request.group
        );
        Ok(deployment_id)
    }
}
