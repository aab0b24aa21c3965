//! Error types for relman

use thiserror::Error;

use crate::manifest::validate::FieldIssue;

/// Main error type for manifest lifecycle operations
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Manifest already exists for version {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed manifest document: {0}")]
    MalformedDocument(String),

    #[error("Manifest validation failed: {}", format_issues(.0))]
    ValidationFailed(Vec<FieldIssue>),

    #[error("Invalid environment '{0}' (expected one of: qa, prod)")]
    InvalidEnvironment(String),

    #[error("Invalid version identifier '{0}'")]
    InvalidVersion(String),

    #[error("Cannot promote {0} to prod: environments.qa.validated is false")]
    QaNotValidated(String),

    #[error("Cannot promote {0} to prod: validation.approvedBy is not set")]
    NotApproved(String),

    #[error("{environment} is already deployed for {version}; re-promotion was not confirmed")]
    RedeployDeclined { version: String, environment: String },

    #[error("Cannot mark {environment} validated for {version}: not deployed yet")]
    NotDeployed { version: String, environment: String },

    #[error("Field '{field}' of {version} is immutable once created")]
    ImmutableField { version: String, field: String },

    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable { collaborator: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManifestError {
    pub fn collaborator(collaborator: &str, reason: impl Into<String>) -> Self {
        ManifestError::CollaboratorUnavailable {
            collaborator: collaborator.to_string(),
            reason: reason.into(),
        }
    }

    /// Failing fields carried by a validation error, if any
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            ManifestError::ValidationFailed(issues) => issues,
            _ => &[],
        }
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<anyhow::Error> for ManifestError {
    fn from(err: anyhow::Error) -> Self {
        ManifestError::Internal(err.to_string())
    }
}
