//! Run configuration
//!
//! Holds the shared test configuration (data map, global headers, services,
//! bootstrap token descriptor), the runner settings that control transports
//! and output, and the YAML loaders for configuration and scenario files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use walkdir::WalkDir;

use crate::error::{DashError, Result};
use crate::scenario::{Auth, Scenario};

/// Directory name that is never descended into when loading scenarios
pub const SKIP_DIR: &str = "skip";

/// Shared configuration for a run. Read-only once the bootstrap step is done.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub data: HashMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, alias = "maskedfields", deserialize_with = "scalar_map")]
    pub masked_fields: HashMap<String, String>,
    #[serde(default, alias = "initfunc")]
    pub init_func: BootstrapToken,
}

/// Named defaults shared by every scenario that targets the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "scalar_map")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub tester: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub stream: bool,
}

/// Describes the HTTP call that yields a bearer token before any scenario runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapToken {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub alias: String,
    /// Path of the token inside the JSON response
    #[serde(default, alias = "getvalue")]
    pub get_value: String,
    /// Global header that receives `Bearer <token>`
    #[serde(default, alias = "targetvalue")]
    pub target_value: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "scalar_map")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub method: String,
}

impl Configuration {
    /// Load the configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        if !is_yaml(path) {
            return Err(DashError::Configuration(format!(
                "provide a configuration yaml file, got {}",
                path.display()
            )));
        }

        log::info!("Loading test configurations from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashError::Configuration(format!("Error reading configs file {}: {}", path.display(), e))
        })?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| DashError::Configuration(format!("Error parsing configs file: {}", e)))
    }

    /// Look up a service definition by name
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }
}

/// Load every scenario template from a YAML file or a directory tree.
///
/// Directories named [`SKIP_DIR`] are ignored and only `.yaml`/`.yml` files
/// are read. Files are read in path order so runs are reproducible.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    log::info!("Loading test scenarios from {}", path.display());

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == SKIP_DIR))
    {
        let entry = entry.map_err(|e| {
            DashError::Configuration(format!("Error walking {}: {}", path.display(), e))
        })?;
        if entry.file_type().is_file() && is_yaml(entry.path()) {
            files.push(entry.into_path());
        }
    }

    let mut scenarios = Vec::new();
    for file in files {
        let content = std::fs::read_to_string(&file).map_err(|e| {
            DashError::Configuration(format!("Error reading scenario file {}: {}", file.display(), e))
        })?;
        let mut parsed: Vec<Scenario> = serde_yaml::from_str(&content).map_err(|e| {
            DashError::Configuration(format!("Error parsing scenario file {}: {}", file.display(), e))
        })?;
        log::debug!("Loaded {} scenario(s) from {}", parsed.len(), file.display());
        scenarios.append(&mut parsed);
    }

    Ok(scenarios)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Settings of the runner itself, independent of the scenarios under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Proxy URL used for every host not listed in `no_proxy`
    #[serde(default)]
    pub proxy: Option<String>,
    /// Comma separated list of hosts reached without the proxy
    #[serde(default)]
    pub no_proxy: String,
    /// Upper bound for a single request, unbounded when absent
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub brokers: String,
    #[serde(default)]
    pub topic: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            no_proxy: String::new(),
            request_timeout_secs: None,
            output_dir: default_output_dir(),
            brokers: String::new(),
            topic: String::new(),
        }
    }
}

impl RunnerSettings {
    /// Load settings from an optional YAML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    DashError::Configuration(format!(
                        "Unable to read the app config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                serde_yaml::from_str(&content).map_err(|e| {
                    DashError::Configuration(format!(
                        "Unable to decode the contents of config file: {}",
                        e
                    ))
                })?
            }
            None => Self::default(),
        };

        settings.apply_environment_overrides()
    }

    fn apply_environment_overrides(mut self) -> Result<Self> {
        if let Ok(proxy) = std::env::var("DASH_PROXY") {
            self.proxy = Some(proxy).filter(|p| !p.is_empty());
        }

        if let Ok(no_proxy) = std::env::var("DASH_NO_PROXY") {
            self.no_proxy = no_proxy;
        }

        if let Ok(timeout) = std::env::var("DASH_REQUEST_TIMEOUT") {
            let secs = timeout.parse().map_err(|_| {
                DashError::Configuration(format!("Invalid DASH_REQUEST_TIMEOUT value: {}", timeout))
            })?;
            self.request_timeout_secs = Some(secs);
        }

        if let Ok(output_dir) = std::env::var("DASH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(output_dir);
        }

        Ok(self)
    }

    /// Hosts that bypass the proxy
    pub fn no_proxy_hosts(&self) -> Vec<String> {
        self.no_proxy
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Deserialize a string map whose YAML values may be any scalar.
pub(crate) fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_yaml::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, scalar_to_string(value)))
        .collect())
}

fn scalar_to_string(value: serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s,
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
