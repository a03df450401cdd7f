//! Artifact staging and download

use async_trait::async_trait;
use tracing::info;

use crate::deploy::target::RepositoryChannel;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::revision::Revision;
use crate::storage::layout::StorageLayout;

/// Maven-style coordinates of an artifact in the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCoordinates {
    pub channel: RepositoryChannel,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
}

impl ArtifactCoordinates {
    /// Query parameters understood by the repository's redirect endpoint
    pub fn query(&self) -> [(&'static str, &str); 5] {
        [
            ("r", self.channel.as_str()),
            ("g", self.group_id.as_str()),
            ("a", self.artifact_id.as_str()),
            ("v", self.version.as_str()),
            ("p", self.packaging.as_str()),
        ]
    }
}

/// Source of versioned artifacts
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Group id applied to every download
    fn group_id(&self) -> &str;

    /// Packaging type applied to every download
    fn packaging(&self) -> &str;

    /// Download the artifact into `dest`, returning the number of bytes written
    async fn download(&self, coords: &ArtifactCoordinates, dest: &File) -> Result<u64, DeployError>;
}

/// Copy the descriptor tree into the staging area, then download the artifact into it
pub async fn stage_artifact(
    layout: &StorageLayout,
    repository: &dyn ArtifactRepository,
    channel: RepositoryChannel,
    revision: &Revision,
) -> Result<File, DeployError> {
    let staging = layout.staging_dir();
    info!("Moving deployment descriptors to {}", staging.path().display());
    staging
        .replace_with_copy_of(&layout.descriptor_dir())
        .await
        .map_err(|e| {
            DeployError::Fetch(format!(
                "unable to stage {}: {}",
                layout.descriptor_dir().path().display(),
                e
            ))
        })?;

    let coords = ArtifactCoordinates {
        channel,
        group_id: repository.group_id().to_string(),
        artifact_id: revision.artifact_id.clone(),
        version: revision.version.clone(),
        packaging: repository.packaging().to_string(),
    };
    let dest = layout.artifact_file();
    info!(
        "Downloading {}:{}:{} from {} into {}",
        coords.group_id,
        coords.artifact_id,
        coords.version,
        coords.channel,
        dest.path().display()
    );

    let bytes = repository.download(&coords, &dest).await?;
    info!("Downloaded {} bytes for {}", bytes, revision);
    Ok(dest)
}
