//! Bundle upload to object storage

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::deploy::target::AwsProfile;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::revision::RevisionLocation;

/// Destination for packaged bundles
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Upload `bundle` to `location`, returning the number of bytes sent
    async fn put_bundle(
        &self,
        profile: &AwsProfile,
        location: &RevisionLocation,
        bundle: &File,
    ) -> Result<u64, DeployError>;
}

/// Publishes bundles through `object_store`.
///
/// Stores are built on first use for each (profile credentials, bucket) and
/// reused for the lifetime of the process. Rotating the access key in the
/// profile file yields a fresh store on the next run.
pub struct ObjectStorePublisher {
    stores: Mutex<HashMap<(String, String), Arc<dyn ObjectStore>>>,
    fixed: Option<Arc<dyn ObjectStore>>,
}

impl ObjectStorePublisher {
    /// Publisher that builds S3 stores lazily
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            fixed: None,
        }
    }

    /// Publisher that writes every bucket into a pre-configured store
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            fixed: Some(store),
        }
    }

    async fn store_for(
        &self,
        profile: &AwsProfile,
        bucket: &str,
    ) -> Result<Arc<dyn ObjectStore>, DeployError> {
        if let Some(store) = &self.fixed {
            return Ok(store.clone());
        }

        let mut stores = self.stores.lock().await;
        let key = (profile.cache_key(), bucket.to_string());
        if let Some(store) = stores.get(&key) {
            return Ok(store.clone());
        }

        debug!("Creating S3 store for bucket {} ({})", bucket, profile.name);
        let store: Arc<dyn ObjectStore> = Arc::new(build_s3_store(profile, bucket)?);
        stores.insert(key, store.clone());
        Ok(store)
    }
}

impl Default for ObjectStorePublisher {
    fn default() -> Self {
        Self::new()
    }
}

fn build_s3_store(
    profile: &AwsProfile,
    bucket: &str,
) -> Result<object_store::aws::AmazonS3, DeployError> {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(&profile.region);

    if let Some(credentials) = &profile.credentials {
        builder = builder
            .with_access_key_id(&credentials.access_key)
            .with_secret_access_key(credentials.secret_key.expose_secret());
    }

    builder
        .build()
        .map_err(|e| DeployError::Publish(format!("failed to create S3 store: {}", e)))
}

#[async_trait]
impl BundleStore for ObjectStorePublisher {
    async fn put_bundle(
        &self,
        profile: &AwsProfile,
        location: &RevisionLocation,
        bundle: &File,
    ) -> Result<u64, DeployError> {
        info!(
            "Uploading {} to {}/{}",
            bundle.path().display(),
            location.bucket,
            location.key
        );
        // Stored verbatim so the object key is exactly the registered revision key
        let path = ObjectPath::parse(&location.key).map_err(|e| {
            DeployError::Publish(format!("invalid object key {}: {}", location.key, e))
        })?;
        let store = self.store_for(profile, &location.bucket).await?;

        let mut reader = bundle
            .open()
            .await
            .map_err(|e| DeployError::Publish(e.to_string()))?;

        let mut writer = BufWriter::new(store, path);
        let sent = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(sent) => sent,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    warn!("Failed to abort upload of {}: {}", location.key, abort_err);
                }
                error!("File upload failed for {}: {}", location.key, e);
                return Err(DeployError::Publish(format!("{}: {}", location.key, e)));
            }
        };
        writer.shutdown().await.map_err(|e| {
            error!("File upload failed for {}: {}", location.key, e);
            DeployError::Publish(format!("{}: {}", location.key, e))
        })?;

        info!(
            "Uploaded {} bytes to {}/{}",
            sent, location.bucket, location.key
        );
        Ok(sent)
    }
}
