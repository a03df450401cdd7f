//! Deployment pipeline executor

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::deploy::compensation::{CommittedStep, Compensation, LeaveInPlace, Ledger};
use crate::deploy::fetch::{stage_artifact, ArtifactRepository};
use crate::deploy::fsm::{PipelineEvent, PipelineFsm};
use crate::deploy::package::package_bundle;
use crate::deploy::publish::BundleStore;
use crate::deploy::register::{CreateDeployment, Orchestrator, RegisterRevision};
use crate::deploy::target::{ConfigResolver, DeploymentTarget};
use crate::errors::DeployError;
use crate::models::request::DeploymentRequest;
use crate::models::revision::{Revision, RevisionLocation};
use crate::storage::layout::{StorageLayout, PACKAGING_DIR_PREFIX};

/// What a successful run started
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReceipt {
    pub revision: Revision,
    pub application: String,
    pub group: String,
    pub location: RevisionLocation,
    pub deployment_id: String,
}

/// The seven-step deployment pipeline.
///
/// Collaborators are injected so that one set of clients serves every run in
/// the process.
pub struct Pipeline {
    layout: StorageLayout,
    resolver: ConfigResolver,
    repository: Arc<dyn ArtifactRepository>,
    store: Arc<dyn BundleStore>,
    orchestrator: Arc<dyn Orchestrator>,
    compensation: Arc<dyn Compensation>,
    /// Held while the shared staging tree is in use
    staging_lock: Mutex<()>,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(
        layout: StorageLayout,
        resolver: ConfigResolver,
        repository: Arc<dyn ArtifactRepository>,
        store: Arc<dyn BundleStore>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        Self {
            layout,
            resolver,
            repository,
            store,
            orchestrator,
            compensation: Arc::new(LeaveInPlace),
            staging_lock: Mutex::new(()),
        }
    }

    /// Replace the compensation hook run on failure
    pub fn with_compensation(mut self, compensation: Arc<dyn Compensation>) -> Self {
        self.compensation = compensation;
        self
    }

    /// Run every stage in order, stopping at the first failure
    pub async fn run(&self, request: &DeploymentRequest) -> Result<DeploymentReceipt, DeployError> {
        let mut fsm = PipelineFsm::new();
        let mut ledger = Ledger::new();

        match self.execute(request, &mut fsm, &mut ledger).await {
            Ok(receipt) => {
                advance(&mut fsm, PipelineEvent::Respond)?;
                Ok(receipt)
            }
            Err(e) => {
                advance(&mut fsm, PipelineEvent::Fail(e.to_string()))?;
                error!("Deployment stopped after {:?}: {}", fsm.reached(), e);
                ledger.unwind(self.compensation.clone()).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &DeploymentRequest,
        fsm: &mut PipelineFsm,
        ledger: &mut Ledger,
    ) -> Result<DeploymentReceipt, DeployError> {
        let revision = Revision::new(&request.artifact_id, &request.version);

        // 1. Resolve target
        let config = self
            .resolver
            .resolve(&request.environment, &request.product)
            .await?;
        advance(fsm, PipelineEvent::ConfigResolved)?;
        let DeploymentTarget {
            bucket,
            application,
            group,
            prefix,
        } = config.target;

        // Dropped on every exit path below, which removes the directory
        let scratch = self
            .layout
            .scratch_root()
            .create_scratch(PACKAGING_DIR_PREFIX)
            .map_err(|e| DeployError::Packaging(format!("unable to create temp dir: {}", e)))?;

        let bundle = {
            let _staging = self.staging_lock.lock().await;

            // 2. Stage descriptors and download the artifact
            let artifact =
                stage_artifact(&self.layout, self.repository.as_ref(), config.channel, &revision)
                    .await?;
            ledger.commit(CommittedStep::Staged {
                artifact: artifact.path().to_path_buf(),
            });
            advance(fsm, PipelineEvent::ArtifactDownloaded)?;

            // 3. Zip the application directory
            let bundle = package_bundle(&self.layout.application_dir(), &scratch, &revision).await?;
            advance(fsm, PipelineEvent::BundlePackaged)?;
            bundle
        };

        // 4. Upload
        let location = RevisionLocation::zip(bucket, revision.object_key(&prefix));
        self.store
            .put_bundle(&config.profile, &location, &bundle)
            .await?;
        ledger.commit(CommittedStep::Published {
            location: location.clone(),
        });
        advance(fsm, PipelineEvent::BundlePublished)?;

        // 5. Register the revision
        self.orchestrator
            .register_revision(
                &config.profile,
                &RegisterRevision {
                    application: application.clone(),
                    description: format!("register revision {}", revision),
                    location: location.clone(),
                },
            )
            .await?;
        ledger.commit(CommittedStep::Registered {
            application: application.clone(),
            revision: revision.clone(),
        });
        advance(fsm, PipelineEvent::RevisionRegistered)?;

        // 6. Start the deployment
        let deployment_id = self
            .orchestrator
            .create_deployment(
                &config.profile,
                &CreateDeployment {
                    application: application.clone(),
                    group: group.clone(),
                    description: format!("deploy revision {}", revision),
                    location: location.clone(),
                },
            )
            .await?;
        ledger.commit(CommittedStep::Deployed {
            deployment_id: deployment_id.clone(),
        });
        advance(fsm, PipelineEvent::DeploymentCreated)?;

        info!(
            "Revision {} deploying to {}/{} as {}",
            revision, application, group, deployment_id
        );

        Ok(DeploymentReceipt {
            revision,
            application,
            group,
            location,
            deployment_id,
        })
    }
}

fn advance(fsm: &mut PipelineFsm, event: PipelineEvent) -> Result<(), DeployError> {
    fsm.process(event).map_err(DeployError::Internal)
}
