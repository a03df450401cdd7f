//! Revision naming

use std::fmt;

use serde::{Deserialize, Serialize};

/// A deployable revision, identified by artifact id and version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    pub artifact_id: String,
    pub version: String,
}

impl Revision {
    pub fn new(artifact_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// `<artifact-id>-<version>`
    pub fn name(&self) -> String {
        format!("{}-{}", self.artifact_id, self.version)
    }

    /// `<revision>.zip`
    pub fn bundle_file_name(&self) -> String {
        format!("{}.zip", self.name())
    }

    /// Storage key of the bundle under `prefix`
    pub fn object_key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.bundle_file_name())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.artifact_id, self.version)
    }
}

/// Bundle format understood by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    Zip,
}

/// Where a revision's bundle lives in object storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionLocation {
    pub bucket: String,
    pub key: String,
    pub bundle_type: BundleType,
}

impl RevisionLocation {
    pub fn zip(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            bundle_type: BundleType::Zip,
        }
    }
}
