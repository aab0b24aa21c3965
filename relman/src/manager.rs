//! Manifest lifecycle manager.
//!
//! Creation, validation, promotion gating and the recording of deployment,
//! validation and approval facts. Every operation except creation fails
//! closed: an error leaves the store untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::collab::{Collaborators, ComponentSource, TriggerHandle};
use crate::errors::ManifestError;
use crate::filesys::file::File;
use crate::manifest::environment::Environment;
use crate::manifest::model::{ComponentKind, ComponentRef, ReleaseManifest};
use crate::manifest::placeholder::{is_placeholder, PLACEHOLDER};
use crate::manifest::store::{check_version, read_existing, ManifestStore};
use crate::manifest::validate::{validate_document, validate_manifest, ValidationReport};
use crate::storage::settings::Settings;

/// Defaults applied to new manifests.
///
/// Built from settings, `default_created_by` falls back to `$USER` when the
/// settings name no author.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub components: BTreeMap<String, ComponentSource>,
    pub tests_required: Vec<String>,
    pub approval_required: bool,
    pub default_created_by: Option<String>,
}

impl From<&Settings> for ManagerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            components: settings.components.clone(),
            tests_required: settings.tests_required.clone(),
            approval_required: settings.approval_required,
            default_created_by: settings
                .default_created_by
                .clone()
                .or_else(|| std::env::var("USER").ok()),
        }
    }
}

/// Caller-supplied metadata for a new manifest
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub created_by: Option<String>,
    pub description: String,
}

/// A newly stored manifest
#[derive(Debug, Clone, Serialize)]
pub struct CreatedManifest {
    pub manifest: ReleaseManifest,
    pub path: PathBuf,
    /// Components left with a placeholder identity
    pub drafts: Vec<String>,
}

/// Answer to "this environment already runs this version, deploy again?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeployDecision {
    Confirm,
    Decline,
}

/// A promotion that passed every gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionPlan {
    pub version: String,
    pub environment: Environment,
    pub redeploy: bool,
    pub warnings: Vec<String>,
}

/// A submitted promotion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionOutcome {
    pub version: String,
    pub environment: Environment,
    pub redeploy: bool,
    pub handle: TriggerHandle,
}

/// Decide whether `manifest` may be promoted to `environment`.
///
/// Pure: the same manifest and decision always give the same answer.
pub fn evaluate_promotion(
    manifest: &ReleaseManifest,
    environment: Environment,
    decision: RedeployDecision,
) -> Result<PromotionPlan, ManifestError> {
    let report = validate_manifest(manifest).into_result()?;

    let redeploy = manifest.is_deployed(environment);
    if redeploy && decision == RedeployDecision::Decline {
        return Err(ManifestError::RedeployDeclined {
            version: manifest.version.clone(),
            environment: environment.to_string(),
        });
    }

    if environment == Environment::Prod {
        if !manifest.is_validated(Environment::Qa) {
            return Err(ManifestError::QaNotValidated(manifest.version.clone()));
        }
        if !manifest.validation.is_approved() {
            return Err(ManifestError::NotApproved(manifest.version.clone()));
        }
    }

    Ok(PromotionPlan {
        version: manifest.version.clone(),
        environment,
        redeploy,
        warnings: report.warnings,
    })
}

/// Per-component line of a summary
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub name: String,
    pub kind: ComponentKind,
    pub identity: Option<String>,
    pub draft: bool,
}

/// Per-environment line of a summary
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentSummary {
    pub name: String,
    pub deployed: Option<DateTime<Utc>>,
    pub validated: bool,
    pub validated_by: Option<String>,
}

/// Structured overview of one manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestSummary {
    pub version: String,
    pub created: String,
    pub created_by: String,
    pub description: String,
    pub components: Vec<ComponentSummary>,
    pub environments: Vec<EnvironmentSummary>,
    pub approval_required: bool,
    pub approved_by: Option<String>,
    pub pending_tests: Vec<String>,
    pub validation: ValidationReport,
}

impl ManifestSummary {
    pub fn of(manifest: &ReleaseManifest) -> Self {
        let components = manifest
            .components
            .iter()
            .map(|(name, component)| ComponentSummary {
                name: name.clone(),
                kind: component.kind(),
                identity: component.identity().map(str::to_string),
                draft: component.identity().map(is_placeholder).unwrap_or(true),
            })
            .collect();

        let environments = manifest
            .environments
            .iter()
            .map(|(name, state)| EnvironmentSummary {
                name: name.clone(),
                deployed: state.deployed,
                validated: state.validated,
                validated_by: state.validated_by.clone(),
            })
            .collect();

        Self {
            version: manifest.version.clone(),
            created: manifest.created.clone(),
            created_by: manifest.created_by.clone(),
            description: manifest.description.clone(),
            components,
            environments,
            approval_required: manifest.validation.approval_required,
            approved_by: manifest.validation.approved_by.clone(),
            pending_tests: manifest
                .validation
                .pending_tests()
                .into_iter()
                .map(str::to_string)
                .collect(),
            validation: validate_manifest(manifest),
        }
    }
}

/// The manifest lifecycle manager
pub struct ManifestManager {
    store: ManifestStore,
    collaborators: Collaborators,
    options: ManagerOptions,
}

impl ManifestManager {
    pub fn new(store: ManifestStore, collaborators: Collaborators, options: ManagerOptions) -> Self {
        Self {
            store,
            collaborators,
            options,
        }
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Create and persist a draft manifest for a new version.
    ///
    /// Unreachable collaborators leave placeholder identities instead of
    /// failing; the result only becomes promotable once validation passes.
    pub async fn create(
        &self,
        version: &str,
        options: CreateOptions,
    ) -> Result<CreatedManifest, ManifestError> {
        check_version(version)?;
        if self.store.exists(version).await? {
            return Err(ManifestError::AlreadyExists(version.to_string()));
        }

        let created_by = options
            .created_by
            .or_else(|| self.options.default_created_by.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let mut manifest =
            ReleaseManifest::draft(version, created_by, options.description, Utc::now());
        let mut drafts = Vec::new();

        for (name, source) in &self.options.components {
            let (component, resolved) = self.resolve_component(name, source).await?;
            if !resolved {
                drafts.push(name.clone());
            }
            manifest.components.insert(name.clone(), component);
        }

        manifest.validation.tests_required = self.options.tests_required.clone();
        manifest.validation.approval_required = self.options.approval_required;

        let file = self.store.create(&manifest).await?;
        if drafts.is_empty() {
            info!("Manifest {} created with all components pinned", version);
        } else {
            warn!(
                "Manifest {} created as draft; pending components: {}",
                version,
                drafts.join(", ")
            );
        }

        Ok(CreatedManifest {
            manifest,
            path: file.path().to_path_buf(),
            drafts,
        })
    }

    async fn resolve_component(
        &self,
        name: &str,
        source: &ComponentSource,
    ) -> Result<(ComponentRef, bool), ManifestError> {
        match source {
            ComponentSource::Git(git) => {
                match self.collaborators.source_control.head_commit(git).await {
                    Ok(commit) => Ok((
                        ComponentRef::source(&git.repository, commit, &git.branch),
                        true,
                    )),
                    Err(e @ ManifestError::CollaboratorUnavailable { .. }) => {
                        warn!("Could not resolve commit for {}: {}", name, e);
                        let component = ComponentRef::source(&git.repository, PLACEHOLDER, &git.branch)
                            .with_notes(format!("commit pending: {}", e));
                        Ok((component, false))
                    }
                    Err(e) => Err(e),
                }
            }
            ComponentSource::Image(image) => {
                match self.collaborators.registry.digest(image).await {
                    Ok(digest) => Ok((
                        ComponentRef::image(&image.registry, &image.repository, &image.tag, digest),
                        true,
                    )),
                    Err(e @ ManifestError::CollaboratorUnavailable { .. }) => {
                        warn!("Could not resolve digest for {}: {}", name, e);
                        let component = ComponentRef::image(
                            &image.registry,
                            &image.repository,
                            &image.tag,
                            PLACEHOLDER,
                        )
                        .with_notes(format!("digest pending: {}", e));
                        Ok((component, false))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Load a stored manifest
    pub async fn load(&self, version: &str) -> Result<ReleaseManifest, ManifestError> {
        self.store.load(version).await
    }

    /// Validate a manifest document at an explicit path
    pub async fn validate_path(&self, path: &Path) -> Result<ValidationReport, ManifestError> {
        let text = read_existing(&File::new(path)).await?;
        validate_document(&text)
    }

    /// Validate a stored manifest
    pub async fn validate_version(&self, version: &str) -> Result<ValidationReport, ManifestError> {
        let manifest = self.store.load(version).await?;
        Ok(validate_manifest(&manifest))
    }

    /// Whether promoting would redeploy an environment that already runs the version
    pub async fn is_redeploy(&self, version: &str, environment: &str) -> Result<bool, ManifestError> {
        let environment: Environment = environment.parse()?;
        Ok(self.store.load(version).await?.is_deployed(environment))
    }

    /// Run every promotion gate without triggering anything
    pub async fn check_promotion(
        &self,
        version: &str,
        environment: &str,
        decision: RedeployDecision,
    ) -> Result<PromotionPlan, ManifestError> {
        let environment: Environment = environment.parse()?;
        let manifest = self.store.load(version).await?;
        evaluate_promotion(&manifest, environment, decision)
    }

    /// Gate a promotion and, if every gate passes, trigger the pipeline once.
    ///
    /// The manifest itself is not modified; deployment facts are recorded
    /// later through [`ManifestManager::record_deployment`].
    pub async fn promote(
        &self,
        version: &str,
        environment: &str,
        decision: RedeployDecision,
    ) -> Result<PromotionOutcome, ManifestError> {
        let plan = self.check_promotion(version, environment, decision).await?;
        for warning in &plan.warnings {
            warn!("{}: {}", plan.version, warning);
        }

        let handle = self
            .collaborators
            .pipeline
            .trigger(&plan.version, plan.environment)
            .await?;
        info!(
            "Promotion of {} to {} triggered ({} {})",
            plan.version, plan.environment, handle.backend, handle.id
        );

        Ok(PromotionOutcome {
            version: plan.version,
            environment: plan.environment,
            redeploy: plan.redeploy,
            handle,
        })
    }

    /// Record that a pipeline deployed the version to an environment
    pub async fn record_deployment(
        &self,
        version: &str,
        environment: &str,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ReleaseManifest, ManifestError> {
        let environment: Environment = environment.parse()?;
        let mut manifest = self.store.load(version).await?;

        let state = manifest.environment_mut(environment);
        state.deployed = Some(at);
        if notes.is_some() {
            state.notes = notes;
        }

        self.store.update(&manifest).await?;
        info!("{} recorded as deployed to {} at {}", version, environment, at);
        Ok(manifest)
    }

    /// Record sign-off of a deployed environment
    pub async fn record_validation(
        &self,
        version: &str,
        environment: &str,
        validated_by: &str,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ReleaseManifest, ManifestError> {
        let environment: Environment = environment.parse()?;
        if validated_by.trim().is_empty() {
            return Err(ManifestError::InvalidInput("validator must not be empty".to_string()));
        }
        let mut manifest = self.store.load(version).await?;

        if !manifest.is_deployed(environment) {
            return Err(ManifestError::NotDeployed {
                version: version.to_string(),
                environment: environment.to_string(),
            });
        }

        let state = manifest.environment_mut(environment);
        state.validated = true;
        state.validated_by = Some(validated_by.to_string());
        state.validated_at = Some(at);
        if notes.is_some() {
            state.notes = notes;
        }

        self.store.update(&manifest).await?;
        info!("{} validated in {} by {}", version, environment, validated_by);
        Ok(manifest)
    }

    /// Record the production approval
    pub async fn record_approval(
        &self,
        version: &str,
        approved_by: &str,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<ReleaseManifest, ManifestError> {
        if approved_by.trim().is_empty() {
            return Err(ManifestError::InvalidInput("approver must not be empty".to_string()));
        }
        let mut manifest = self.store.load(version).await?;

        manifest.validation.approved_by = Some(approved_by.to_string());
        manifest.validation.approved_at = Some(at);
        if notes.is_some() {
            manifest.validation.approval_notes = notes;
        }

        self.store.update(&manifest).await?;
        info!("{} approved by {}", version, approved_by);
        Ok(manifest)
    }

    /// Record a passed test suite
    pub async fn record_test_passed(
        &self,
        version: &str,
        suite: &str,
    ) -> Result<ReleaseManifest, ManifestError> {
        let mut manifest = self.store.load(version).await?;

        if !manifest.validation.tests_required.iter().any(|s| s == suite) {
            warn!("{} is not a required suite for {}", suite, version);
        }
        if !manifest.validation.tests_passed.iter().any(|s| s == suite) {
            manifest.validation.tests_passed.push(suite.to_string());
            self.store.update(&manifest).await?;
        }

        Ok(manifest)
    }

    /// Stored versions, sorted
    pub async fn list(&self) -> Result<Vec<String>, ManifestError> {
        self.store.list().await
    }

    /// Structured summary of a stored manifest
    pub async fn summary(&self, version: &str) -> Result<ManifestSummary, ManifestError> {
        let manifest = self.store.load(version).await?;
        Ok(ManifestSummary::of(&manifest))
    }
}
