//! Settings file management

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collab::{ComponentSource, GitSource, ImageSource};
use crate::errors::ManifestError;
use crate::filesys::file::File;
use crate::logs::{LogFormat, LogLevel};

/// relman settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Stderr log line format: text or json
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional JSON audit log
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Directory holding `release-<version>.yaml` documents, relative to the
    /// settings file
    #[serde(default = "default_manifests_dir")]
    pub manifests_dir: PathBuf,

    /// `createdBy` for new manifests when the caller does not give one
    #[serde(default)]
    pub default_created_by: Option<String>,

    /// Upper bound on any single git/registry/pipeline call
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout_secs: u64,

    /// Components pinned by every new manifest
    #[serde(default = "default_components")]
    pub components: BTreeMap<String, ComponentSource>,

    /// Test suites every new manifest requires
    #[serde(default = "default_tests_required")]
    pub tests_required: Vec<String>,

    /// Whether new manifests require an approver before prod
    #[serde(default = "default_true")]
    pub approval_required: bool,

    /// Source-control collaborator
    #[serde(default)]
    pub git: GitSettings,

    /// Image registry collaborator
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Pipeline trigger collaborator
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

fn default_true() -> bool {
    true
}

fn default_manifests_dir() -> PathBuf {
    PathBuf::from("releases")
}

fn default_collaborator_timeout() -> u64 {
    30
}

fn default_tests_required() -> Vec<String> {
    vec![
        "smoke-tests".to_string(),
        "integration-tests".to_string(),
        "security-scan".to_string(),
    ]
}

fn default_components() -> BTreeMap<String, ComponentSource> {
    let mut components = BTreeMap::new();
    components.insert(
        "aap_configuration".to_string(),
        ComponentSource::Git(GitSource {
            repository: String::new(),
            branch: "main".to_string(),
        }),
    );
    components.insert(
        "collections".to_string(),
        ComponentSource::Git(GitSource {
            repository: String::new(),
            branch: "main".to_string(),
        }),
    );
    components.insert(
        "execution_environment".to_string(),
        ComponentSource::Image(ImageSource {
            registry: String::new(),
            repository: String::new(),
            tag: "latest".to_string(),
        }),
    );
    components
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            log_format: LogFormat::Text,
            log_file: None,
            manifests_dir: default_manifests_dir(),
            default_created_by: None,
            collaborator_timeout_secs: default_collaborator_timeout(),
            components: default_components(),
            tests_required: default_tests_required(),
            approval_required: true,
            git: GitSettings::default(),
            registry: RegistrySettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, ManifestError> {
        if !file.exists().await {
            debug!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }

        let settings: Settings = file.read_json().await.map_err(|e| {
            ManifestError::ConfigError(format!("{}: {}", file.path().display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Reject settings that would only fail later, mid-operation
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.collaborator_timeout_secs == 0 {
            return Err(ManifestError::ConfigError(
                "collaborator_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.pipeline.pipeline.trim().is_empty() {
            return Err(ManifestError::ConfigError(
                "pipeline.pipeline must name a pipeline".to_string(),
            ));
        }

        if self.pipeline.backend == PipelineBackend::Webhook {
            let url = self.pipeline.webhook_url.as_deref().ok_or_else(|| {
                ManifestError::ConfigError(
                    "pipeline.webhook_url is required for the webhook backend".to_string(),
                )
            })?;
            url::Url::parse(url).map_err(|e| {
                ManifestError::ConfigError(format!("pipeline.webhook_url '{}': {}", url, e))
            })?;
        }

        for (name, source) in &self.components {
            if name.trim().is_empty() {
                return Err(ManifestError::ConfigError("component names must not be empty".to_string()));
            }
            if let ComponentSource::Git(git) = source {
                if git.branch.trim().is_empty() {
                    return Err(ManifestError::ConfigError(format!(
                        "components.{}.branch must not be empty",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Source-control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// git executable
    #[serde(default = "default_git_bin")]
    pub binary: String,
}

fn default_git_bin() -> String {
    "git".to_string()
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary: default_git_bin(),
        }
    }
}

/// How image digests are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// `podman image inspect`
    #[default]
    Podman,
    /// OCI distribution API over HTTPS
    Http,
}

/// Image registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    #[serde(default)]
    pub backend: RegistryBackend,

    /// podman executable
    #[serde(default = "default_podman_bin")]
    pub podman_binary: String,

    /// Environment variable holding a registry bearer token (http backend)
    #[serde(default)]
    pub token_env: Option<String>,
}

fn default_podman_bin() -> String {
    "podman".to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::default(),
            podman_binary: default_podman_bin(),
            token_env: None,
        }
    }
}

/// How promotion pipelines are started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineBackend {
    /// `tkn pipeline start`
    #[default]
    Tkn,
    /// POST to a Tekton EventListener
    Webhook,
}

/// Pipeline trigger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub backend: PipelineBackend,

    /// tkn executable
    #[serde(default = "default_tkn_bin")]
    pub tkn_binary: String,

    /// Pipeline to start
    #[serde(default = "default_pipeline")]
    pub pipeline: String,

    /// Kubernetes namespace of the pipeline
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Pipeline parameter receiving the manifest version
    #[serde(default = "default_version_param")]
    pub version_param: String,

    /// Pipeline parameter receiving the target environment
    #[serde(default = "default_environment_param")]
    pub environment_param: String,

    /// EventListener URL (webhook backend)
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_tkn_bin() -> String {
    "tkn".to_string()
}

fn default_pipeline() -> String {
    "release-promotion".to_string()
}

fn default_namespace() -> String {
    "aap-release".to_string()
}

fn default_version_param() -> String {
    "release-version".to_string()
}

fn default_environment_param() -> String {
    "target-environment".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            backend: PipelineBackend::default(),
            tkn_binary: default_tkn_bin(),
            pipeline: default_pipeline(),
            namespace: default_namespace(),
            version_param: default_version_param(),
            environment_param: default_environment_param(),
            webhook_url: None,
        }
    }
}
