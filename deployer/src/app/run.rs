//! Wiring of settings into a pipeline, and the two ways of running it

use std::future::Future;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::info;

use crate::deploy::executor::Pipeline;
use crate::deploy::handler::handle_invocation;
use crate::deploy::publish::ObjectStorePublisher;
use crate::deploy::register::CodeDeployOrchestrator;
use crate::deploy::target::ConfigResolver;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::http::client::RepositoryClient;
use crate::models::request::ProxyResponse;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Build the production pipeline: Nexus over HTTP, S3 through object_store, CodeDeploy
pub fn build_pipeline(settings: &Settings) -> Result<Pipeline, DeployError> {
    let layout = StorageLayout::new(&settings.paths);
    let resolver = ConfigResolver::new(layout.environment_dir(), settings.aws.region.clone());
    let repository = RepositoryClient::new(&settings.artifact_repository)?;

    info!(
        "Artifact repository: {} (group {})",
        repository.base_url(),
        settings.artifact_repository.group_id
    );

    Ok(Pipeline::new(
        layout,
        resolver,
        Arc::new(repository),
        Arc::new(ObjectStorePublisher::new()),
        Arc::new(CodeDeployOrchestrator::new()),
    ))
}

/// Serve deployments over HTTP until the shutdown signal fires
pub async fn run_server(
    settings: &Settings,
    pipeline: Pipeline,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeployError> {
    let state = Arc::new(ServerState::new(Arc::new(pipeline)));
    serve(&settings.server, state, shutdown_signal).await?;
    info!("HTTP server stopped");
    Ok(())
}

/// Run one invocation with the body read from `source` (`-` is stdin)
pub async fn run_once(pipeline: &Pipeline, source: &str) -> Result<ProxyResponse, DeployError> {
    let body = if source == "-" {
        let mut body = String::new();
        tokio::io::stdin().read_to_string(&mut body).await?;
        body
    } else {
        File::new(source).read_string().await?
    };

    Ok(handle_invocation(pipeline, &body).await)
}
