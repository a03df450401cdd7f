//! Record of side effects a run has committed, and the hook that undoes them

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::errors::DeployError;
use crate::models::revision::{Revision, RevisionLocation};

/// A stage whose side effect outlives the stage itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommittedStep {
    /// Descriptor tree copied and artifact written to the staging area
    Staged { artifact: PathBuf },
    /// Bundle uploaded to object storage
    Published { location: RevisionLocation },
    /// Revision known to the orchestrator
    Registered { application: String, revision: Revision },
    /// Deployment started
    Deployed { deployment_id: String },
}

/// Undo hook for committed steps
#[async_trait]
pub trait Compensation: Send + Sync {
    async fn compensate(&self, step: &CommittedStep) -> Result<(), DeployError>;
}

/// Leaves every side effect where it is and says so
#[derive(Debug, Default, Clone, Copy)]
pub struct LeaveInPlace;

#[async_trait]
impl Compensation for LeaveInPlace {
    async fn compensate(&self, step: &CommittedStep) -> Result<(), DeployError> {
        match step {
            CommittedStep::Staged { artifact } => {
                warn!("Staged artifact left at {}", artifact.display());
            }
            CommittedStep::Published { location } => {
                warn!(
                    "Bundle {}/{} left in storage with no deployment using it",
                    location.bucket, location.key
                );
            }
            CommittedStep::Registered {
                application,
                revision,
            } => {
                warn!(
                    "Revision {} stays registered with {}",
                    revision, application
                );
            }
            CommittedStep::Deployed { deployment_id } => {
                warn!("Deployment {} was started and is not rolled back", deployment_id);
            }
        }
        Ok(())
    }
}

/// Ordered log of committed steps for one run
#[derive(Debug, Default)]
pub struct Ledger {
    steps: Vec<CommittedStep>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, step: CommittedStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[CommittedStep] {
        &self.steps
    }

    /// Run the compensation for every committed step, newest first.
    ///
    /// A failing compensation is logged and does not stop the others.
    pub async fn unwind(self, compensation: Arc<dyn Compensation>) {
        for step in self.steps.iter().rev() {
            if let Err(e) = compensation.compensate(step).await {
                error!("Compensation failed for {:?}: {}", step, e);
            }
        }
    }
}
