//! Image registry collaborators

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::collab::{run_tool, ImageRegistry, ImageSource};
use crate::errors::ManifestError;

const COLLABORATOR: &str = "image registry";

const MANIFEST_MEDIA_TYPES: &str = "application/vnd.oci.image.index.v1+json, \
application/vnd.docker.distribution.manifest.list.v2+json, \
application/vnd.oci.image.manifest.v1+json, \
application/vnd.docker.distribution.manifest.v2+json";

fn check_source(source: &ImageSource) -> Result<(), ManifestError> {
    if source.registry.trim().is_empty() || source.repository.trim().is_empty() {
        return Err(ManifestError::collaborator(
            COLLABORATOR,
            "no registry/repository configured",
        ));
    }
    Ok(())
}

/// Reads the digest podman recorded for an image
#[derive(Debug, Clone)]
pub struct PodmanRegistry {
    binary: String,
    timeout: Duration,
}

impl PodmanRegistry {
    pub fn new(binary: &str, timeout: Duration) -> Self {
        Self {
            binary: binary.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ImageRegistry for PodmanRegistry {
    async fn digest(&self, source: &ImageSource) -> Result<String, ManifestError> {
        check_source(source)?;
        let reference = source.reference();

        let args = vec![
            "image".to_string(),
            "inspect".to_string(),
            "--format".to_string(),
            "{{.Digest}}".to_string(),
            reference.clone(),
        ];
        let digest = run_tool(COLLABORATOR, &self.binary, &args, self.timeout).await?;

        if digest.is_empty() {
            return Err(ManifestError::collaborator(
                COLLABORATOR,
                format!("no digest reported for {}", reference),
            ));
        }

        info!("{} resolved to {}", reference, digest);
        Ok(digest)
    }
}

/// Resolves digests through the OCI distribution API
pub struct HttpRegistry {
    client: Client,
    token: Option<SecretString>,
}

impl HttpRegistry {
    pub fn new(token: Option<SecretString>, timeout: Duration) -> Result<Self, ManifestError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, token })
    }

    /// Read the bearer token from the named environment variable, if any
    pub fn from_env(token_env: Option<&str>, timeout: Duration) -> Result<Self, ManifestError> {
        let token = token_env.and_then(|var| match std::env::var(var) {
            Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
            _ => {
                warn!("{} is not set, querying the registry anonymously", var);
                None
            }
        });
        Self::new(token, timeout)
    }
}

/// `https://<registry>/v2/<repository>/manifests/<tag>`
pub fn manifest_url(source: &ImageSource) -> String {
    let registry = source.registry.trim_end_matches('/');
    let base = if registry.starts_with("http://") || registry.starts_with("https://") {
        registry.to_string()
    } else {
        format!("https://{}", registry)
    };
    format!("{}/v2/{}/manifests/{}", base, source.repository, source.tag)
}

#[async_trait]
impl ImageRegistry for HttpRegistry {
    async fn digest(&self, source: &ImageSource) -> Result<String, ManifestError> {
        check_source(source)?;
        let url = manifest_url(source);
        debug!("HEAD {}", url);

        let mut request = self
            .client
            .head(&url)
            .header(header::ACCEPT, MANIFEST_MEDIA_TYPES);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ManifestError::collaborator(COLLABORATOR, e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ManifestError::collaborator(
                    COLLABORATOR,
                    format!("not authorized to read {}", source.reference()),
                ));
            }
            StatusCode::NOT_FOUND => {
                return Err(ManifestError::collaborator(
                    COLLABORATOR,
                    format!("{} not found", source.reference()),
                ));
            }
            status => {
                return Err(ManifestError::collaborator(
                    COLLABORATOR,
                    format!("{} returned {}", url, status),
                ));
            }
        }

        let digest = response
            .headers()
            .get("docker-content-digest")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ManifestError::collaborator(
                    COLLABORATOR,
                    format!("{} returned no Docker-Content-Digest header", url),
                )
            })?;

        info!("{} resolved to {}", source.reference(), digest);
        Ok(digest)
    }
}
