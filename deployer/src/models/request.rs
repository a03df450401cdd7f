//! Inbound request and outbound response envelopes

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Body returned when the payload is not a deployment request
pub const PARSE_FAILURE_BODY: &str = "Could not parse request body";

/// Prefix of every failure body
pub const ERROR_PREFIX: &str = "error :: ";

/// A deployment request, as posted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Target environment: qa, staging, prod, ...
    pub environment: String,

    /// Artifact version
    pub version: String,

    /// Instance identifier (accepted, not used)
    #[serde(default)]
    pub instance: String,

    /// Artifact id
    #[serde(rename = "artifactid")]
    pub artifact_id: String,

    /// Must be true for anything to happen
    #[serde(default)]
    pub codedeploy: bool,

    /// Product name, used to derive the deployment application and group
    pub product: String,
}

impl DeploymentRequest {
    /// Parse a request from its JSON body
    pub fn parse(body: &str) -> Result<Self, DeployError> {
        serde_json::from_str(body).map_err(|e| DeployError::RequestParse(e.to_string()))
    }

    /// Reject requests that must not reach any collaborator
    pub fn validate(&self) -> Result<(), DeployError> {
        if !self.codedeploy {
            return Err(DeployError::DeploymentDisabled);
        }

        let required = [
            ("environment", &self.environment),
            ("version", &self.version),
            ("artifactid", &self.artifact_id),
            ("product", &self.product),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(DeployError::InvalidRequest(format!("{} must not be empty", name)));
            }
            if !is_path_safe(value) {
                return Err(DeployError::InvalidRequest(format!(
                    "{} must not contain path separators, '..' or control characters",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Identifiers end up in local file names and storage keys
fn is_path_safe(value: &str) -> bool {
    !value.contains("..") && !value.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub body: String,
    pub status_code: u16,
}

impl ProxyResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            status_code: 200,
        }
    }

    /// Failure envelope carrying the error text
    pub fn from_error(err: &DeployError) -> Self {
        Self {
            body: format!("{}{}", ERROR_PREFIX, err),
            status_code: 500,
        }
    }

    /// Failure envelope for a payload that did not parse
    pub fn parse_failure() -> Self {
        Self {
            body: PARSE_FAILURE_BODY.to_string(),
            status_code: 500,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Status message for a completed deployment
pub fn success_message(environment: &str, version: &str) -> String {
    format!(
        "App successfully deployed to {}. version ==> {}",
        environment, version
    )
}
