//! Release manifest document model.
//!
//! Field names follow the on-disk YAML contract (camelCase). Keys this model
//! does not know about are kept in `extra` maps so rewriting a manifest never
//! drops facts another tool appended.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::environment::Environment;

/// Free-form YAML fields preserved across rewrites
pub type ExtraFields = BTreeMap<String, serde_yaml::Value>;

/// A pinned release: one document per version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseManifest {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub created: String,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub components: BTreeMap<String, ComponentRef>,

    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentState>,

    #[serde(default)]
    pub validation: ValidationState,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ReleaseManifest {
    /// A fresh draft with every known environment undeployed
    pub fn draft(
        version: impl Into<String>,
        created_by: impl Into<String>,
        description: impl Into<String>,
        created: DateTime<Utc>,
    ) -> Self {
        let environments = Environment::ALL
            .iter()
            .map(|env| (env.as_str().to_string(), EnvironmentState::default()))
            .collect();

        Self {
            version: version.into(),
            created: created.to_rfc3339(),
            created_by: created_by.into(),
            description: description.into(),
            components: BTreeMap::new(),
            environments,
            validation: ValidationState::default(),
            metadata: Metadata::default(),
            extra: ExtraFields::new(),
        }
    }

    pub fn environment(&self, env: Environment) -> Option<&EnvironmentState> {
        self.environments.get(env.as_str())
    }

    /// Mutable state for an environment, created undeployed if absent
    pub fn environment_mut(&mut self, env: Environment) -> &mut EnvironmentState {
        self.environments.entry(env.as_str().to_string()).or_default()
    }

    /// Whether the environment has a recorded deployment
    pub fn is_deployed(&self, env: Environment) -> bool {
        self.environment(env)
            .map(|state| state.deployed.is_some())
            .unwrap_or(false)
    }

    pub fn is_validated(&self, env: Environment) -> bool {
        self.environment(env).map(|state| state.validated).unwrap_or(false)
    }
}

/// Which field authoritatively identifies a component's artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Source-controlled; identified by `commit`
    Source,
    /// Container image; identified by `digest`
    Image,
}

impl ComponentKind {
    pub fn identity_field(&self) -> &'static str {
        match self {
            ComponentKind::Source => "commit",
            ComponentKind::Image => "digest",
        }
    }
}

/// Reference to one exact artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Informational only; never used to identify the artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Informational only; `digest` is authoritative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ComponentRef {
    pub fn source(
        repository: impl Into<String>,
        commit: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            repository: Some(repository.into()),
            commit: Some(commit.into()),
            branch: Some(branch.into()),
            ..Default::default()
        }
    }

    pub fn image(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            registry: Some(registry.into()),
            repository: Some(repository.into()),
            tag: Some(tag.into()),
            digest: Some(digest.into()),
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Image components carry a registry or a digest; everything else is source
    pub fn kind(&self) -> ComponentKind {
        if self.digest.is_some() || self.registry.is_some() {
            ComponentKind::Image
        } else {
            ComponentKind::Source
        }
    }

    /// The authoritative identity value, if present
    pub fn identity(&self) -> Option<&str> {
        match self.kind() {
            ComponentKind::Source => self.commit.as_deref(),
            ComponentKind::Image => self.digest.as_deref(),
        }
    }
}

/// Deployment and sign-off facts for one environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentState {
    /// `None` means never deployed to this environment
    #[serde(default)]
    pub deployed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub validated: bool,

    #[serde(default)]
    pub validated_by: Option<String>,

    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Test and approval requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationState {
    #[serde(default)]
    pub tests_required: Vec<String>,

    #[serde(default)]
    pub tests_passed: Vec<String>,

    #[serde(default = "default_true")]
    pub approval_required: bool,

    #[serde(default)]
    pub approved_by: Option<String>,

    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub approval_notes: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationState {
    fn default() -> Self {
        Self {
            tests_required: Vec::new(),
            tests_passed: Vec::new(),
            approval_required: true,
            approved_by: None,
            approved_at: None,
            approval_notes: None,
        }
    }
}

impl ValidationState {
    /// Required suites with no recorded pass, in declaration order
    pub fn pending_tests(&self) -> Vec<&str> {
        self.tests_required
            .iter()
            .filter(|suite| !self.tests_passed.contains(suite))
            .map(String::as_str)
            .collect()
    }

    /// Whether the production approval gate is satisfied
    pub fn is_approved(&self) -> bool {
        !self.approval_required || self.approved_by.is_some()
    }
}

/// Auxiliary release metadata; carries no invariants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub jira_ticket: Option<String>,

    #[serde(default)]
    pub pull_requests: Vec<String>,

    #[serde(default)]
    pub documentation: Option<String>,

    #[serde(default)]
    pub rollback_tested: bool,

    #[serde(default)]
    pub rollback_procedure: Option<String>,

    #[serde(default)]
    pub known_issues: Vec<String>,

    #[serde(default)]
    pub workarounds: Vec<String>,

    #[serde(flatten)]
    pub extra: ExtraFields,
}
