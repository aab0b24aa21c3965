//! Promotion pipeline triggers

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collab::{run_tool, PipelineTrigger};
use crate::errors::ManifestError;
use crate::manifest::environment::Environment;
use crate::storage::settings::PipelineSettings;

const COLLABORATOR: &str = "pipeline engine";

/// Acknowledgement of a submitted promotion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerHandle {
    /// PipelineRun name or EventListener event id
    pub id: String,
    pub backend: String,
}

/// Starts a Tekton pipeline with `tkn pipeline start`
#[derive(Debug, Clone)]
pub struct TknTrigger {
    binary: String,
    pipeline: String,
    namespace: String,
    version_param: String,
    environment_param: String,
    timeout: Duration,
}

impl TknTrigger {
    pub fn new(settings: &PipelineSettings, timeout: Duration) -> Self {
        Self {
            binary: settings.tkn_binary.clone(),
            pipeline: settings.pipeline.clone(),
            namespace: settings.namespace.clone(),
            version_param: settings.version_param.clone(),
            environment_param: settings.environment_param.clone(),
            timeout,
        }
    }

    pub fn args(&self, version: &str, environment: Environment) -> Vec<String> {
        vec![
            "pipeline".to_string(),
            "start".to_string(),
            self.pipeline.clone(),
            "--namespace".to_string(),
            self.namespace.clone(),
            "--param".to_string(),
            format!("{}={}", self.version_param, version),
            "--param".to_string(),
            format!("{}={}", self.environment_param, environment),
            "--use-param-defaults".to_string(),
        ]
    }
}

#[async_trait]
impl PipelineTrigger for TknTrigger {
    async fn trigger(
        &self,
        version: &str,
        environment: Environment,
    ) -> Result<TriggerHandle, ManifestError> {
        info!("Starting pipeline {} for {} -> {}", self.pipeline, version, environment);

        let stdout = run_tool(
            COLLABORATOR,
            &self.binary,
            &self.args(version, environment),
            self.timeout,
        )
        .await?;

        let id = parse_pipeline_run(&stdout).unwrap_or_else(|| self.pipeline.clone());
        info!("PipelineRun {} submitted", id);

        Ok(TriggerHandle {
            id,
            backend: "tkn".to_string(),
        })
    }
}

/// Extract the run name from `tkn pipeline start` output
pub fn parse_pipeline_run(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("PipelineRun started:")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    })
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    version: &'a str,
    environment: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookAck {
    #[serde(default, alias = "eventID")]
    event_id: Option<String>,
}

/// Posts promotion requests to a Tekton EventListener
pub struct WebhookTrigger {
    client: Client,
    url: String,
}

impl WebhookTrigger {
    pub fn new(settings: &PipelineSettings, timeout: Duration) -> Result<Self, ManifestError> {
        let url = settings
            .webhook_url
            .clone()
            .ok_or_else(|| ManifestError::ConfigError("pipeline.webhook_url is not set".to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PipelineTrigger for WebhookTrigger {
    async fn trigger(
        &self,
        version: &str,
        environment: Environment,
    ) -> Result<TriggerHandle, ManifestError> {
        debug!("POST {}", self.url);

        let payload = WebhookPayload {
            version,
            environment: environment.as_str(),
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ManifestError::collaborator(COLLABORATOR, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ManifestError::collaborator(
                COLLABORATOR,
                format!("{} returned {}: {}", self.url, status, body),
            ));
        }

        let ack: Option<WebhookAck> = response.json().await.ok();
        let id = ack
            .and_then(|ack| ack.event_id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        info!("Promotion event {} accepted for {} -> {}", id, version, environment);

        Ok(TriggerHandle {
            id,
            backend: "webhook".to_string(),
        })
    }
}
