//! External collaborators: source control, image registry, pipeline engine.
//!
//! Every call is bounded by a timeout and reports failure as
//! `CollaboratorUnavailable`; nothing here touches the manifest store.

pub mod git;
pub mod pipeline;
pub mod registry;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::errors::ManifestError;
use crate::manifest::environment::Environment;
use crate::storage::settings::{PipelineBackend, RegistryBackend, Settings};
use crate::utils::with_timeout;

pub use pipeline::TriggerHandle;

/// A component pinned by commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    #[serde(default)]
    pub repository: String,

    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// A component pinned by image digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(default)]
    pub registry: String,

    #[serde(default)]
    pub repository: String,

    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    "latest".to_string()
}

impl ImageSource {
    /// `registry/repository:tag`
    pub fn reference(&self) -> String {
        format!("{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

/// Where a component's identity is looked up at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentSource {
    Git(GitSource),
    Image(ImageSource),
}

/// Resolves the current head commit of a repository branch
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn head_commit(&self, source: &GitSource) -> Result<String, ManifestError>;
}

/// Resolves the content digest of an image reference
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    async fn digest(&self, source: &ImageSource) -> Result<String, ManifestError>;
}

/// Starts a promotion workflow without waiting for it to finish
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    async fn trigger(
        &self,
        version: &str,
        environment: Environment,
    ) -> Result<TriggerHandle, ManifestError>;
}

/// The collaborators a manager is constructed with
#[derive(Clone)]
pub struct Collaborators {
    pub source_control: Arc<dyn SourceControl>,
    pub registry: Arc<dyn ImageRegistry>,
    pub pipeline: Arc<dyn PipelineTrigger>,
}

impl Collaborators {
    /// Build the CLI/HTTP collaborators named in the settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ManifestError> {
        let timeout = settings.collaborator_timeout();

        let source_control: Arc<dyn SourceControl> =
            Arc::new(git::GitCli::new(&settings.git.binary, timeout));

        let registry: Arc<dyn ImageRegistry> = match settings.registry.backend {
            RegistryBackend::Podman => Arc::new(registry::PodmanRegistry::new(
                &settings.registry.podman_binary,
                timeout,
            )),
            RegistryBackend::Http => Arc::new(registry::HttpRegistry::from_env(
                settings.registry.token_env.as_deref(),
                timeout,
            )?),
        };

        let pipeline: Arc<dyn PipelineTrigger> = match settings.pipeline.backend {
            PipelineBackend::Tkn => Arc::new(pipeline::TknTrigger::new(&settings.pipeline, timeout)),
            PipelineBackend::Webhook => {
                Arc::new(pipeline::WebhookTrigger::new(&settings.pipeline, timeout)?)
            }
        };

        Ok(Self {
            source_control,
            registry,
            pipeline,
        })
    }
}

/// Run an external tool and return its trimmed stdout
pub(crate) async fn run_tool(
    collaborator: &str,
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<String, ManifestError> {
    debug!("Running {} {}", program, args.join(" "));

    let output = with_timeout(collaborator, timeout, async {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ManifestError::collaborator(collaborator, format!("failed to run {}: {}", program, e)))
    })
    .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ManifestError::collaborator(
            collaborator,
            format!("{} exited with {}: {}", program, output.status, stderr),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
