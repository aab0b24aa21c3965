//! Manifest validation.
//!
//! Structural problems (the document is not YAML, or does not have the
//! manifest shape) stop validation immediately. Field problems are collected
//! exhaustively so one run shows every field that needs attention.
//!
//! Validation is a pure function of the manifest content.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::errors::ManifestError;
use crate::manifest::environment::Environment;
use crate::manifest::model::{ComponentKind, ReleaseManifest};
use crate::manifest::placeholder::{is_commit_sha, is_image_digest, is_placeholder, is_semver_like};

/// Why a field failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IssueReason {
    /// Field absent
    Missing,
    /// Field still holds a placeholder sentinel
    Placeholder { value: String },
    /// Field present but not in the required format
    Malformed { value: String, expected: String },
    /// Field contradicts another field
    Inconsistent { detail: String },
}

/// One failing field, addressed by its dotted document path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    #[serde(flatten)]
    pub reason: IssueReason,
}

impl FieldIssue {
    fn new(field: impl Into<String>, reason: IssueReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            IssueReason::Missing => write!(f, "{}: missing", self.field),
            IssueReason::Placeholder { value } => {
                write!(f, "{}: placeholder value '{}'", self.field, value)
            }
            IssueReason::Malformed { value, expected } => {
                write!(f, "{}: '{}' is not {}", self.field, value, expected)
            }
            IssueReason::Inconsistent { detail } => write!(f, "{}: {}", self.field, detail),
        }
    }
}

/// Outcome of validating one manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub version: String,
    pub passed: bool,
    pub issues: Vec<FieldIssue>,
    /// Advisory findings; never fail validation
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Convert a failed report into `ValidationFailed` carrying every issue
    pub fn into_result(self) -> Result<ValidationReport, ManifestError> {
        if self.passed {
            Ok(self)
        } else {
            Err(ManifestError::ValidationFailed(self.issues))
        }
    }
}

/// Parse a manifest document, failing with `MalformedDocument` on syntax or
/// shape errors
pub fn parse_document(text: &str) -> Result<ReleaseManifest, ManifestError> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ManifestError::MalformedDocument(e.to_string()))?;

    let Some(root) = value.as_mapping_mut() else {
        return Err(ManifestError::MalformedDocument(
            "document root must be a mapping".to_string(),
        ));
    };

    // Hand-edited documents often carry `version: 2.0` unquoted
    let unquoted = match root.get("version") {
        Some(serde_yaml::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    };
    if let Some(version) = unquoted {
        warn!("version {} is not quoted, reading it as a string", version);
        root.insert("version".into(), serde_yaml::Value::String(version));
    }

    serde_yaml::from_value(value).map_err(|e| ManifestError::MalformedDocument(e.to_string()))
}

/// Validate raw document text
pub fn validate_document(text: &str) -> Result<ValidationReport, ManifestError> {
    let manifest = parse_document(text)?;
    Ok(validate_manifest(&manifest))
}

/// Check every invariant-bearing field of a parsed manifest
pub fn validate_manifest(manifest: &ReleaseManifest) -> ValidationReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let version = manifest.version.trim();
    if version.is_empty() {
        issues.push(FieldIssue::new("version", IssueReason::Missing));
    } else if !is_semver_like(version) {
        warnings.push(format!("version '{}' is not a semantic version", version));
    }

    if manifest.components.is_empty() {
        issues.push(FieldIssue::new("components", IssueReason::Missing));
    }

    for (name, component) in &manifest.components {
        let kind = component.kind();
        let field = format!("components.{}.{}", name, kind.identity_field());

        match component.identity() {
            None => issues.push(FieldIssue::new(field, IssueReason::Missing)),
            Some(value) if is_placeholder(value) => issues.push(FieldIssue::new(
                field,
                IssueReason::Placeholder {
                    value: value.to_string(),
                },
            )),
            Some(value) => {
                let (well_formed, expected) = match kind {
                    ComponentKind::Source => (is_commit_sha(value), "a full 40-character commit SHA"),
                    ComponentKind::Image => (is_image_digest(value), "a sha256 image digest"),
                };
                if !well_formed {
                    issues.push(FieldIssue::new(
                        field,
                        IssueReason::Malformed {
                            value: value.to_string(),
                            expected: expected.to_string(),
                        },
                    ));
                }
            }
        }

        if kind == ComponentKind::Image && component.tag.is_none() {
            warnings.push(format!("components.{} has no tag", name));
        }
    }

    for (name, state) in &manifest.environments {
        if state.validated && state.deployed.is_none() {
            issues.push(FieldIssue::new(
                format!("environments.{}.validated", name),
                IssueReason::Inconsistent {
                    detail: "validated without a recorded deployment".to_string(),
                },
            ));
        }
        if name.parse::<Environment>().is_err() {
            warnings.push(format!("environments.{} is not a known environment", name));
        }
    }

    let pending = manifest.validation.pending_tests();
    if !pending.is_empty() {
        warnings.push(format!("required tests not yet passed: {}", pending.join(", ")));
    }

    if manifest.metadata.rollback_procedure.is_none() {
        warnings.push("metadata.rollbackProcedure is not documented".to_string());
    }

    ValidationReport {
        version: manifest.version.clone(),
        passed: issues.is_empty(),
        issues,
        warnings,
    }
}
