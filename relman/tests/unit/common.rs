//! Shared fixtures: in-memory collaborators and a temp-dir backed manager

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use relman::collab::{
    Collaborators, ComponentSource, GitSource, ImageRegistry, ImageSource, PipelineTrigger,
    SourceControl, TriggerHandle,
};
use relman::errors::ManifestError;
use relman::filesys::dir::Dir;
use relman::manager::{ManagerOptions, ManifestManager};
use relman::manifest::environment::Environment;
use relman::manifest::store::ManifestStore;

pub const CONFIG_REPO: &str = "https://git.example.com/aap-config.git";
pub const COLLECTIONS_REPO: &str = "https://git.example.com/aap-collections.git";
pub const CONFIG_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
pub const COLLECTIONS_SHA: &str = "9fceb02d0ae598e95dc970b74767f19372d61af8";

pub fn ee_digest() -> String {
    format!("sha256:{}", "c0ffee00".repeat(8))
}

pub fn ee_source() -> ImageSource {
    ImageSource {
        registry: "quay.io".to_string(),
        repository: "example/ee-supported".to_string(),
        tag: "2.4".to_string(),
    }
}

/// Source control that knows a fixed set of repository heads
#[derive(Default)]
pub struct FakeSourceControl {
    pub heads: HashMap<String, String>,
}

impl FakeSourceControl {
    pub fn reachable() -> Self {
        let mut heads = HashMap::new();
        heads.insert(CONFIG_REPO.to_string(), CONFIG_SHA.to_string());
        heads.insert(COLLECTIONS_REPO.to_string(), COLLECTIONS_SHA.to_string());
        Self { heads }
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn head_commit(&self, source: &GitSource) -> Result<String, ManifestError> {
        self.heads
            .get(&source.repository)
            .cloned()
            .ok_or_else(|| ManifestError::collaborator("source control", "repository unreachable"))
    }
}

/// Registry that knows a fixed set of image digests
#[derive(Default)]
pub struct FakeRegistry {
    pub digests: HashMap<String, String>,
}

impl FakeRegistry {
    pub fn reachable() -> Self {
        let mut digests = HashMap::new();
        digests.insert(ee_source().reference(), ee_digest());
        Self { digests }
    }
}

#[async_trait]
impl ImageRegistry for FakeRegistry {
    async fn digest(&self, source: &ImageSource) -> Result<String, ManifestError> {
        self.digests
            .get(&source.reference())
            .cloned()
            .ok_or_else(|| ManifestError::collaborator("image registry", "image not found"))
    }
}

/// Pipeline trigger that records every call
#[derive(Default)]
pub struct RecordingPipeline {
    pub calls: Mutex<Vec<(String, Environment)>>,
    pub fail: bool,
}

impl RecordingPipeline {
    pub fn calls(&self) -> Vec<(String, Environment)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineTrigger for RecordingPipeline {
    async fn trigger(
        &self,
        version: &str,
        environment: Environment,
    ) -> Result<TriggerHandle, ManifestError> {
        if self.fail {
            return Err(ManifestError::collaborator("pipeline engine", "connection refused"));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push((version.to_string(), environment));
        Ok(TriggerHandle {
            id: format!("run-{}", calls.len()),
            backend: "fake".to_string(),
        })
    }
}

pub fn manager_options() -> ManagerOptions {
    let mut components = BTreeMap::new();
    components.insert(
        "aap_configuration".to_string(),
        ComponentSource::Git(GitSource {
            repository: CONFIG_REPO.to_string(),
            branch: "main".to_string(),
        }),
    );
    components.insert(
        "collections".to_string(),
        ComponentSource::Git(GitSource {
            repository: COLLECTIONS_REPO.to_string(),
            branch: "main".to_string(),
        }),
    );
    components.insert(
        "execution_environment".to_string(),
        ComponentSource::Image(ee_source()),
    );

    ManagerOptions {
        components,
        tests_required: vec![
            "smoke-tests".to_string(),
            "integration-tests".to_string(),
            "security-scan".to_string(),
        ],
        approval_required: true,
        default_created_by: Some("release-bot".to_string()),
    }
}

/// A manager over a fresh temp directory
pub struct Harness {
    pub manager: ManifestManager,
    pub pipeline: Arc<RecordingPipeline>,
    pub dir: Dir,
}

impl Harness {
    /// All collaborators reachable
    pub async fn new() -> Self {
        Self::with(
            FakeSourceControl::reachable(),
            FakeRegistry::reachable(),
            RecordingPipeline::default(),
        )
        .await
    }

    /// Source control and registry unreachable
    pub async fn offline() -> Self {
        Self::with(
            FakeSourceControl::default(),
            FakeRegistry::default(),
            RecordingPipeline::default(),
        )
        .await
    }

    pub async fn with(
        source_control: FakeSourceControl,
        registry: FakeRegistry,
        pipeline: RecordingPipeline,
    ) -> Self {
        let dir = Dir::create_temp_dir("relman-test").await.unwrap();
        let pipeline = Arc::new(pipeline);
        let collaborators = Collaborators {
            source_control: Arc::new(source_control),
            registry: Arc::new(registry),
            pipeline: pipeline.clone(),
        };
        let manager = ManifestManager::new(
            ManifestStore::new(dir.clone()),
            collaborators,
            manager_options(),
        );

        Self {
            manager,
            pipeline,
            dir,
        }
    }

    /// Raw stored document, for before/after comparisons
    pub async fn stored_text(&self, version: &str) -> String {
        self.manager
            .store()
            .file_for(version)
            .unwrap()
            .read_string()
            .await
            .unwrap()
    }

    pub async fn cleanup(self) {
        let _ = self.dir.delete().await;
    }
}
