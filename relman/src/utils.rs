//! Utility functions

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ManifestError;

/// Version information for relman
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Bound a collaborator call; expiry becomes `CollaboratorUnavailable`
pub async fn with_timeout<T, F>(collaborator: &str, timeout: Duration, call: F) -> Result<T, ManifestError>
where
    F: Future<Output = Result<T, ManifestError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ManifestError::collaborator(
            collaborator,
            format!("timed out after {:?}", timeout),
        )),
    }
}
