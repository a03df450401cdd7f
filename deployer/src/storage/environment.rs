//! Environment-scoped settings (credentials and bucket per settings profile)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// Contents of `<environment_dir>/<profile>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSettings {
    pub aws: EnvironmentAws,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentAws {
    #[serde(default)]
    pub access_key: String,

    #[serde(default = "empty_secret")]
    pub secret_key: SecretString,

    #[serde(default)]
    pub bucket_name: String,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl EnvironmentAws {
    /// Static credentials, if both halves are configured
    pub fn static_credentials(&self) -> Option<(String, SecretString)> {
        if self.access_key.trim().is_empty() || self.secret_key.expose_secret().trim().is_empty() {
            return None;
        }
        Some((self.access_key.clone(), self.secret_key.clone()))
    }
}

/// Settings profile for an environment: `prod` gets its own file, everything else shares `staging`
pub fn profile_for(environment: &str) -> &'static str {
    match environment {
        "prod" => "prod",
        _ => "staging",
    }
}

/// Read the settings profile for `environment` from `dir`
pub async fn load_environment(
    dir: &Dir,
    environment: &str,
) -> Result<EnvironmentSettings, DeployError> {
    let file = dir.file(&format!("{}.json", profile_for(environment)));
    file.read_json::<EnvironmentSettings>().await.map_err(|e| {
        DeployError::Configuration(format!(
            "unable to read environment settings {}: {}",
            file.path().display(),
            e
        ))
    })
}
