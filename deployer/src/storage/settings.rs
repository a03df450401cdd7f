//! Settings file management

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Artifact repository configuration
    #[serde(default)]
    pub artifact_repository: RepositorySettings,

    /// AWS configuration shared by storage and the orchestrator
    #[serde(default)]
    pub aws: AwsSettings,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            server: ServerSettings::default(),
            artifact_repository: RepositorySettings::default(),
            aws: AwsSettings::default(),
            paths: PathSettings::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Artifact repository (Nexus redirect endpoint) settings
#[derive(Debug, Clone, Deserialize)]
pub struct RepositorySettings {
    /// URL of the artifact redirect endpoint; query parameters are appended
    #[serde(default = "default_repository_url")]
    pub base_url: String,

    /// Artifact group, e.g. `com.example.product`
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Packaging type requested from the repository
    #[serde(default = "default_packaging")]
    pub packaging: String,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Fail the download on a non-2xx status instead of writing the body to disk
    #[serde(default = "default_true")]
    pub require_success_status: bool,

    /// Overall timeout for the artifact download
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_repository_url() -> String {
    "http://localhost:8081/service/local/artifact/maven/redirect".to_string()
}

fn default_group_id() -> String {
    "com.example.product".to_string()
}

fn default_packaging() -> String {
    "war".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            base_url: default_repository_url(),
            group_id: default_group_id(),
            packaging: default_packaging(),
            username: None,
            password: None,
            require_success_status: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// AWS settings
#[derive(Debug, Clone, Deserialize)]
pub struct AwsSettings {
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
        }
    }
}

/// Filesystem locations used by a deployment
#[derive(Debug, Clone, Deserialize)]
pub struct PathSettings {
    /// Directory holding `<profile>.json` environment settings
    #[serde(default = "default_environment_dir")]
    pub environment_dir: PathBuf,

    /// Deployment descriptor tree copied into the scratch area for each run
    #[serde(default = "default_descriptor_dir")]
    pub descriptor_dir: PathBuf,

    /// Root for the staging tree and the packaging temp dirs
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Application directory inside the descriptor tree; this is what gets zipped
    #[serde(default = "default_application_dir")]
    pub application_dir: String,

    /// Where the downloaded artifact lands, relative to the application directory
    #[serde(default = "default_artifact_file")]
    pub artifact_file: String,
}

fn default_environment_dir() -> PathBuf {
    PathBuf::from("./environment")
}

fn default_descriptor_dir() -> PathBuf {
    PathBuf::from("./codedeploy")
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_application_dir() -> String {
    "java-app".to_string()
}

fn default_artifact_file() -> String {
    "content/ROOT.war".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            environment_dir: default_environment_dir(),
            descriptor_dir: default_descriptor_dir(),
            scratch_root: default_scratch_root(),
            application_dir: default_application_dir(),
            artifact_file: default_artifact_file(),
        }
    }
}
