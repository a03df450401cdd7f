//! Request handler: body in, response envelope out

use tracing::{error, info, info_span, Instrument};

use crate::deploy::executor::Pipeline;
use crate::models::request::{success_message, DeploymentRequest, ProxyResponse};

/// Handle one deployment invocation.
///
/// Never fails: every error becomes a 500 envelope carrying its text.
pub async fn handle_invocation(pipeline: &Pipeline, body: &str) -> ProxyResponse {
    let invocation_id = uuid::Uuid::new_v4();
    let span = info_span!("invocation", id = %invocation_id);

    async move {
        let request = match DeploymentRequest::parse(body) {
            Ok(request) => request,
            Err(e) => {
                error!("{}", e);
                return ProxyResponse::parse_failure();
            }
        };
        info!(
            environment = %request.environment,
            product = %request.product,
            artifact = %request.artifact_id,
            version = %request.version,
            instance = %request.instance,
            "Received deployment request"
        );

        if let Err(e) = request.validate() {
            error!("Rejected request: {}", e);
            return ProxyResponse::from_error(&e);
        }

        match pipeline.run(&request).await {
            Ok(receipt) => {
                info!(deployment_id = %receipt.deployment_id, "Deployment started");
                ProxyResponse::ok(success_message(&request.environment, &request.version))
            }
            Err(e) => {
                error!("Deployment failed: {}", e);
                ProxyResponse::from_error(&e)
            }
        }
    }
    .instrument(span)
    .await
}
