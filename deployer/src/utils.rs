//! Build metadata

use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "deploy-trigger";

/// What was built, from which commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub service: String,
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
    pub profile: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        profile: option_env!("BUILD_PROFILE").unwrap_or("unknown").to_string(),
    }
}

/// `User-Agent` sent to the artifact repository, e.g. `deploy-trigger/0.1.0 (3f2a9c1)`
pub fn user_agent() -> String {
    let info = version_info();
    format!("{}/{} ({})", info.service, info.version, info.git_hash)
}
