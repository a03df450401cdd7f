//! Deploy Trigger - Entry Point
//!
//! Fetches a versioned artifact, bundles it with the deployment descriptors,
//! uploads the bundle and starts a CodeDeploy deployment.

use std::env;
use std::process::ExitCode;

use deploy_trigger::app::options::{load_settings, CliOptions, Mode, SETTINGS_ENV};
use deploy_trigger::app::run::{build_pipeline, run_once, run_server};
use deploy_trigger::logs::{init_logging, LogOptions};
use deploy_trigger::utils::version_info;

use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let options = CliOptions::parse(env::args().skip(1), env::var(SETTINGS_ENV).ok());

    if options.mode == Mode::Version {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(ExitCode::SUCCESS);
    }

    let (settings, found) = load_settings(&options.settings_path).await?;

    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }
    if !found {
        warn!(
            "Settings file {} not found, using defaults",
            options.settings_path.display()
        );
    }

    let pipeline = build_pipeline(&settings)?;

    match options.mode {
        Mode::Invoke(source) => {
            let response = run_once(&pipeline, &source).await?;
            println!("{}", serde_json::to_string(&response)?);
            Ok(if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        _ => {
            info!("Running deploy trigger {}", version_info().version);
            if let Err(e) = run_server(&settings, pipeline, await_shutdown_signal()).await {
                error!("Server failed: {e}");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Unable to listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
