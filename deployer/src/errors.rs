//! Error types for the deployment trigger

use thiserror::Error;

/// Main error type for a deployment invocation.
///
/// Every variant is terminal for the invocation it occurs in. The `Display`
/// text is what ends up in the response body after the `error :: ` prefix.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Could not parse request body: {0}")]
    RequestParse(String),

    #[error("Please enable codedeploy")]
    DeploymentDisabled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Artifact fetch failed: {0}")]
    Fetch(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Revision registration failed: {0}")]
    Registration(String),

    #[error("Deployment failed: {0}")]
    Deployment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
