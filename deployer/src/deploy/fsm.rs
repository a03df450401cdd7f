//! Finite State Machine for a deployment invocation

use serde::{Deserialize, Serialize};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Request accepted, nothing done yet
    ReceivedRequest,

    /// Deployment target resolved
    ConfigResolved,

    /// Artifact staged on local disk
    DownloadedArtifact,

    /// Bundle zipped
    Packaged,

    /// Bundle uploaded to object storage
    Published,

    /// Revision registered with the orchestrator
    Registered,

    /// Deployment started
    Deployed,

    /// Terminal, with or without an error
    Responded,
}

/// Pipeline event
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    ConfigResolved,
    ArtifactDownloaded,
    BundlePackaged,
    BundlePublished,
    RevisionRegistered,
    DeploymentCreated,

    /// Finish after a successful deployment
    Respond,

    /// Any stage failed; jump straight to `Responded`
    Fail(String),
}

/// Pipeline FSM
#[derive(Debug, Clone)]
pub struct PipelineFsm {
    state: PipelineState,
    error: Option<String>,
    /// Last non-terminal state reached
    reached: PipelineState,
}

impl PipelineFsm {
    /// Create a new FSM for a freshly received request
    pub fn new() -> Self {
        Self {
            state: PipelineState::ReceivedRequest,
            error: None,
            reached: PipelineState::ReceivedRequest,
        }
    }

    /// Get current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Furthest stage completed before responding
    pub fn reached(&self) -> PipelineState {
        self.reached
    }

    /// True once the FSM responded without an error
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Responded && self.error.is_none()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PipelineEvent) -> Result<(), String> {
        use PipelineEvent as E;
        use PipelineState as S;

        let new_state = match (self.state, &event) {
            (S::ReceivedRequest, E::ConfigResolved) => S::ConfigResolved,
            (S::ConfigResolved, E::ArtifactDownloaded) => S::DownloadedArtifact,
            (S::DownloadedArtifact, E::BundlePackaged) => S::Packaged,
            (S::Packaged, E::BundlePublished) => S::Published,
            (S::Published, E::RevisionRegistered) => S::Registered,
            (S::Registered, E::DeploymentCreated) => S::Deployed,
            (S::Deployed, E::Respond) => S::Responded,

            (S::Responded, event) => {
                return Err(format!("Invalid transition: Responded -> {:?}", event));
            }
            (_, E::Fail(err)) => {
                self.error = Some(err.clone());
                S::Responded
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        if new_state != S::Responded {
            self.reached = new_state;
        }
        self.state = new_state;
        Ok(())
    }
}

impl Default for PipelineFsm {
    fn default() -> Self {
        Self::new()
    }
}
