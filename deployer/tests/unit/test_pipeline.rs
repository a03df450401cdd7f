//! End-to-end pipeline tests against in-process collaborators

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use deploy_trigger::deploy::compensation::{CommittedStep, Compensation};
use deploy_trigger::deploy::executor::Pipeline;
use deploy_trigger::deploy::fetch::{ArtifactCoordinates, ArtifactRepository};
use deploy_trigger::deploy::handler::handle_invocation;
use deploy_trigger::deploy::publish::ObjectStorePublisher;
use deploy_trigger::deploy::register::{CreateDeployment, Orchestrator, RegisterRevision};
use deploy_trigger::deploy::target::{AwsProfile, ConfigResolver, RepositoryChannel};
use deploy_trigger::errors::DeployError;
use deploy_trigger::filesys::file::File;
use deploy_trigger::storage::layout::StorageLayout;
use deploy_trigger::storage::settings::PathSettings;
use tempfile::TempDir;

const WAR_BYTES: &[u8] = b"PK\x03\x04 fake war";

struct FakeRepository {
    fail_with: Option<String>,
    downloads: Mutex<Vec<ArtifactCoordinates>>,
}

impl FakeRepository {
    fn ok() -> Self {
        Self {
            fail_with: None,
            downloads: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            downloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ArtifactRepository for FakeRepository {
    fn group_id(&self) -> &str {
        "com.example.shop"
    }

    fn packaging(&self) -> &str {
        "war"
    }

    async fn download(
        &self,
        coords: &ArtifactCoordinates,
        dest: &File,
    ) -> Result<u64, DeployError> {
        self.downloads.lock().await.push(coords.clone());
        if let Some(message) = &self.fail_with {
            return Err(DeployError::Fetch(message.clone()));
        }
        let mut out = dest.create().await?;
        out.write_all(WAR_BYTES).await?;
        out.flush().await?;
        Ok(WAR_BYTES.len() as u64)
    }
}

#[derive(Default)]
struct FakeOrchestrator {
    fail_register: bool,
    fail_deploy: bool,
    calls: Mutex<Vec<String>>,
    deployments: AtomicUsize,
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn register_revision(
        &self,
        _profile: &AwsProfile,
        request: &RegisterRevision,
    ) -> Result<(), DeployError> {
        self.calls.lock().await.push(format!(
            "register {} {} {}",
            request.application, request.description, request.location.key
        ));
        if self.fail_register {
            return Err(DeployError::Registration("application does not exist".to_string()));
        }
        Ok(())
    }

    async fn create_deployment(
        &self,
        _profile: &AwsProfile,
        request: &CreateDeployment,
    ) -> Result<String, DeployError> {
        self.calls.lock().await.push(format!(
            "deploy {} {} {}",
            request.application, request.group, request.description
        ));
        if self.fail_deploy {
            return Err(DeployError::Deployment("group is busy".to_string()));
        }
        let n = self.deployments.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("d-{:08}", n))
    }
}

#[derive(Default)]
struct RecordingCompensation {
    steps: Mutex<Vec<CommittedStep>>,
}

#[async_trait]
impl Compensation for RecordingCompensation {
    async fn compensate(&self, step: &CommittedStep) -> Result<(), DeployError> {
        self.steps.lock().await.push(step.clone());
        Ok(())
    }
}

struct Fixture {
    tmp: TempDir,
    store: Arc<InMemory>,
    repository: Arc<FakeRepository>,
    orchestrator: Arc<FakeOrchestrator>,
}

impl Fixture {
    fn new(repository: FakeRepository, orchestrator: FakeOrchestrator) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        fs::create_dir_all(root.join("environment")).unwrap();
        fs::write(
            root.join("environment/staging.json"),
            r#"{"aws": {"access_key": "", "secret_key": "", "bucket_name": "staging-artifacts"}}"#,
        )
        .unwrap();

        fs::create_dir_all(root.join("codedeploy/java-app/scripts")).unwrap();
        fs::write(
            root.join("codedeploy/java-app/appspec.yml"),
            "version: 0.0\nos: linux\n",
        )
        .unwrap();
        fs::write(root.join("codedeploy/java-app/scripts/start.sh"), "#!/bin/sh\n").unwrap();
        fs::create_dir_all(root.join("scratch")).unwrap();

        Self {
            tmp,
            store: Arc::new(InMemory::new()),
            repository: Arc::new(repository),
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn paths(&self) -> PathSettings {
        let root = self.tmp.path();
        PathSettings {
            environment_dir: root.join("environment"),
            descriptor_dir: root.join("codedeploy"),
            scratch_root: root.join("scratch"),
            ..Default::default()
        }
    }

    fn pipeline(&self) -> Pipeline {
        let layout = StorageLayout::new(&self.paths());
        let resolver = ConfigResolver::new(layout.environment_dir(), "us-east-1");
        Pipeline::new(
            layout,
            resolver,
            self.repository.clone(),
            Arc::new(ObjectStorePublisher::with_store(self.store.clone())),
            self.orchestrator.clone(),
        )
    }

    fn scratch_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.paths().scratch_root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn leftover_packaging_dirs(&self) -> Vec<String> {
        self.scratch_entries()
            .into_iter()
            .filter(|name| name.starts_with("app_zip"))
            .collect()
    }

    async fn stored_keys(&self, prefix: &str) -> Vec<String> {
        let listed = self
            .store
            .list_with_delimiter(Some(&ObjectPath::from(prefix)))
            .await
            .unwrap();
        listed
            .objects
            .iter()
            .map(|meta| meta.location.to_string())
            .collect()
    }

    async fn object(&self, key: &str) -> Option<Vec<u8>> {
        let result = self.store.get(&ObjectPath::from(key)).await.ok()?;
        Some(result.bytes().await.unwrap().to_vec())
    }

    async fn downloads(&self) -> usize {
        self.repository.downloads.lock().await.len()
    }

    async fn orchestrator_calls(&self) -> Vec<String> {
        self.orchestrator.calls.lock().await.clone()
    }
}

fn request_body(environment: &str, version: &str, codedeploy: bool) -> String {
    request_for("web", environment, version, codedeploy)
}

fn request_for(artifact_id: &str, environment: &str, version: &str, codedeploy: bool) -> String {
    serde_json::json!({
        "environment": environment,
        "version": version,
        "instance": "i-0abc",
        "artifactid": artifact_id,
        "codedeploy": codedeploy,
        "product": "shop",
    })
    .to_string()
}

#[tokio::test]
async fn test_successful_deployment() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();

    let response = handle_invocation(&pipeline, &request_body("staging", "1.0.0", true)).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.body,
        "App successfully deployed to staging. version ==> 1.0.0"
    );

    let downloads = fixture.repository.downloads.lock().await.clone();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].channel, RepositoryChannel::Snapshots);
    assert_eq!(downloads[0].artifact_id, "web");
    assert_eq!(downloads[0].version, "1.0.0");

    assert_eq!(
        fixture.orchestrator_calls().await,
        vec![
            concat!(
                "register shop-app-staging register revision web-1.0.0 ",
                "shop-folder-staging/web-1.0.0.zip"
            )
            .to_string(),
            "deploy shop-app-staging shop-group-staging deploy revision web-1.0.0".to_string(),
        ]
    );

    let bundle = fixture
        .object("shop-folder-staging/web-1.0.0.zip")
        .await
        .expect("bundle uploaded");
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bundle)).unwrap();
    let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["appspec.yml", "content/ROOT.war", "scripts/start.sh"]);
    assert_eq!(archive.by_name("content/ROOT.war").unwrap().size(), WAR_BYTES.len() as u64);

    assert!(fixture.leftover_packaging_dirs().is_empty());
}

#[tokio::test]
async fn test_receipt_carries_deployment_id() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();
    let request = deploy_trigger::models::request::DeploymentRequest::parse(&request_body(
        "qa", "2.0.0", true,
    ))
    .unwrap();

    let receipt = pipeline.run(&request).await.unwrap();
    assert_eq!(receipt.deployment_id, "d-00000001");
    assert_eq!(receipt.application, "shop-app-qa");
    assert_eq!(receipt.group, "shop-group-qa");
    assert_eq!(receipt.location.bucket, "staging-artifacts");
    assert_eq!(receipt.location.key, "shop-folder-qa/web-2.0.0.zip");
}

#[tokio::test]
async fn test_disabled_deployment_touches_nothing() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();

    let response = handle_invocation(&pipeline, &request_body("staging", "1.0.0", false)).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, "error :: Please enable codedeploy");
    assert_eq!(fixture.downloads().await, 0);
    assert!(fixture.orchestrator_calls().await.is_empty());
    assert!(fixture.object("shop-folder-staging/web-1.0.0.zip").await.is_none());
}

#[tokio::test]
async fn test_unparseable_body() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();

    for body in ["", "{", r#"{"environment": ["qa"]}"#, r#"{"codedeploy": true}"#] {
        let response = handle_invocation(&pipeline, body).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, "Could not parse request body");
    }

    assert_eq!(fixture.downloads().await, 0);
    assert!(fixture.orchestrator_calls().await.is_empty());
}

#[tokio::test]
async fn test_download_failure_stops_pipeline() {
    let fixture = Fixture::new(
        FakeRepository::failing("repository returned 404 Not Found for web:1.0.0"),
        FakeOrchestrator::default(),
    );
    let pipeline = fixture.pipeline();

    let response = handle_invocation(&pipeline, &request_body("staging", "1.0.0", true)).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(
        response.body,
        "error :: Artifact fetch failed: repository returned 404 Not Found for web:1.0.0"
    );
    assert_eq!(fixture.downloads().await, 1);
    assert!(fixture.object("shop-folder-staging/web-1.0.0.zip").await.is_none());
    assert!(fixture.orchestrator_calls().await.is_empty());
    assert!(fixture.leftover_packaging_dirs().is_empty());
}

#[tokio::test]
async fn test_registration_failure_leaves_bundle_in_storage() {
    let fixture = Fixture::new(
        FakeRepository::ok(),
        FakeOrchestrator {
            fail_register: true,
            ..Default::default()
        },
    );
    let compensation = Arc::new(RecordingCompensation::default());
    let pipeline = fixture.pipeline().with_compensation(compensation.clone());

    let response = handle_invocation(&pipeline, &request_body("staging", "1.0.0", true)).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(
        response.body,
        "error :: Revision registration failed: application does not exist"
    );

    // No compensating delete
    assert!(fixture.object("shop-folder-staging/web-1.0.0.zip").await.is_some());

    let calls = fixture.orchestrator_calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("register "));

    let steps = compensation.steps.lock().await.clone();
    assert_eq!(steps.len(), 2);
    assert!(matches!(
        &steps[0],
        CommittedStep::Published { location } if location.key == "shop-folder-staging/web-1.0.0.zip"
    ));
    assert!(matches!(&steps[1], CommittedStep::Staged { .. }));
}

#[tokio::test]
async fn test_deployment_failure() {
    let fixture = Fixture::new(
        FakeRepository::ok(),
        FakeOrchestrator {
            fail_deploy: true,
            ..Default::default()
        },
    );
    let pipeline = fixture.pipeline();

    let response = handle_invocation(&pipeline, &request_body("qa", "3.1.4", true)).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, "error :: Deployment failed: group is busy");
    assert_eq!(fixture.orchestrator_calls().await.len(), 2);
}

#[tokio::test]
async fn test_missing_environment_settings() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();

    // prod has no settings file in the fixture
    let response = handle_invocation(&pipeline, &request_body("prod", "1.0.0", true)).await;

    assert_eq!(response.status_code, 500);
    assert!(response.body.starts_with("error :: Configuration error:"));
    assert!(response.body.contains("prod.json"));
    assert_eq!(fixture.downloads().await, 0);
    assert!(fixture.leftover_packaging_dirs().is_empty());
}

#[tokio::test]
async fn test_same_revision_twice_overwrites_object() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();
    let body = request_body("staging", "1.0.0", true);

    assert!(handle_invocation(&pipeline, &body).await.is_success());
    assert!(handle_invocation(&pipeline, &body).await.is_success());

    let registrations = fixture
        .orchestrator_calls()
        .await
        .into_iter()
        .filter(|c| c.starts_with("register "))
        .count();
    assert_eq!(registrations, 2);
    assert!(fixture.object("shop-folder-staging/web-1.0.0.zip").await.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_invocations_do_not_share_staging() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = Arc::new(fixture.pipeline());

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            handle_invocation(&pipeline, &request_body("staging", "1.0.0", true)).await
        })
    };
    let second = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            handle_invocation(&pipeline, &request_body("staging", "1.0.1", true)).await
        })
    };

    assert!(first.await.unwrap().is_success());
    assert!(second.await.unwrap().is_success());

    for key in [
        "shop-folder-staging/web-1.0.0.zip",
        "shop-folder-staging/web-1.0.1.zip",
    ] {
        let bundle = fixture.object(key).await.expect("bundle uploaded");
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bundle)).unwrap();
        assert_eq!(archive.len(), 3);
    }
    assert!(fixture.leftover_packaging_dirs().is_empty());
}

#[tokio::test]
async fn test_stored_key_matches_registered_revision() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();

    let response = handle_invocation(&pipeline, &request_body("staging", "1.0.0~rc1", true)).await;
    assert!(response.is_success());

    let calls = fixture.orchestrator_calls().await;
    let registered_key = calls[0].rsplit(' ').next().unwrap().to_string();
    assert_eq!(registered_key, "shop-folder-staging/web-1.0.0~rc1.zip");
    assert_eq!(
        fixture.stored_keys("shop-folder-staging").await,
        vec![registered_key]
    );
}

#[tokio::test]
async fn test_path_like_artifact_id_is_rejected() {
    let fixture = Fixture::new(FakeRepository::ok(), FakeOrchestrator::default());
    let pipeline = fixture.pipeline();

    for artifact_id in ["../escaped", "nested/web", "..\\escaped"] {
        let body = request_for(artifact_id, "staging", "1.0.0", true);
        let response = handle_invocation(&pipeline, &body).await;

        assert_eq!(response.status_code, 500);
        assert!(
            response.body.starts_with("error :: Invalid request: artifactid"),
            "{}",
            response.body
        );
    }

    assert_eq!(fixture.downloads().await, 0);
    assert!(fixture.orchestrator_calls().await.is_empty());
    assert!(fixture.scratch_entries().is_empty());
    assert!(!fixture.tmp.path().join("escaped-1.0.0.zip").exists());
}
