//! Command line options and settings loading

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::storage::settings::Settings;

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "DEPLOY_TRIGGER_SETTINGS";

const DEFAULT_SETTINGS_PATH: &str = "./settings.json";

/// How the process was asked to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print version info and exit
    Version,
    /// Run a single invocation read from a file (`-` for stdin)
    Invoke(String),
    /// Serve `POST /deploy` until shut down
    Serve,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub mode: Mode,
    pub settings_path: PathBuf,
}

impl CliOptions {
    /// Parse `--key=value` and `--flag` arguments (program name excluded)
    pub fn parse<I, S>(args: I, settings_env: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cli_args: HashMap<String, String> = HashMap::new();
        for arg in args {
            let arg = arg.as_ref();
            if let Some((key, value)) = arg.split_once('=') {
                cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
            } else if arg.starts_with("--") {
                cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
            }
        }

        let mode = if cli_args.contains_key("version") {
            Mode::Version
        } else if let Some(source) = cli_args.get("invoke") {
            Mode::Invoke(source.clone())
        } else {
            Mode::Serve
        };

        let settings_path = cli_args
            .get("settings")
            .cloned()
            .or(settings_env)
            .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());

        Self {
            mode,
            settings_path: PathBuf::from(settings_path),
        }
    }
}

/// Read the settings file. A missing file yields the defaults and `false`.
pub async fn load_settings(path: &Path) -> Result<(Settings, bool), DeployError> {
    let file = File::new(path);
    if !file.exists().await {
        return Ok((Settings::default(), false));
    }
    let settings = file.read_json::<Settings>().await.map_err(|e| {
        DeployError::Configuration(format!("unable to read {}: {}", path.display(), e))
    })?;
    Ok((settings, true))
}
