//! Flat-directory manifest store.
//!
//! One `release-<version>.yaml` per version. Records are created once and
//! never deleted; updates may only append environment, validation and
//! metadata facts.

use std::io::ErrorKind;

use tracing::{debug, info};

use crate::errors::ManifestError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::manifest::model::ReleaseManifest;
use crate::manifest::validate::parse_document;

const FILE_PREFIX: &str = "release-";
const FILE_SUFFIX: &str = ".yaml";

/// Manifest store rooted at a directory
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: Dir,
}

impl ManifestStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    /// Deterministic document location for a version
    pub fn file_for(&self, version: &str) -> Result<File, ManifestError> {
        check_version(version)?;
        Ok(self.dir.file(&format!("{FILE_PREFIX}{version}{FILE_SUFFIX}")))
    }

    pub async fn exists(&self, version: &str) -> Result<bool, ManifestError> {
        Ok(self.file_for(version)?.exists().await)
    }

    /// Load the manifest for a version
    pub async fn load(&self, version: &str) -> Result<ReleaseManifest, ManifestError> {
        let file = self.file_for(version)?;
        load_file(&file, version).await
    }

    /// Persist a new manifest; fails with `AlreadyExists` if the version is taken
    pub async fn create(&self, manifest: &ReleaseManifest) -> Result<File, ManifestError> {
        let file = self.file_for(&manifest.version)?;
        match file.create_new_yaml(manifest).await {
            Ok(()) => {
                info!("Created manifest {}", file.path().display());
                Ok(file)
            }
            Err(ManifestError::IoError(e)) if e.kind() == ErrorKind::AlreadyExists => {
                Err(ManifestError::AlreadyExists(manifest.version.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Rewrite an existing manifest with appended facts.
    ///
    /// Identity fields (`version`, `created`, `createdBy`, `components`) must
    /// match the stored record, and the stored record must be the one its
    /// file name says.
    pub async fn update(&self, manifest: &ReleaseManifest) -> Result<File, ManifestError> {
        let file = self.file_for(&manifest.version)?;
        let stored = load_file(&file, &manifest.version).await?;
        check_immutable(&stored, manifest)?;

        file.write_yaml_atomic(manifest).await?;
        debug!("Updated manifest {}", file.path().display());
        Ok(file)
    }

    /// Stored versions, sorted
    pub async fn list(&self) -> Result<Vec<String>, ManifestError> {
        let mut versions: Vec<String> = self
            .dir
            .list_files()
            .await?
            .iter()
            .filter_map(|path| path.file_name()?.to_str())
            .filter_map(|name| name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX))
            .map(str::to_string)
            .collect();
        versions.sort();
        Ok(versions)
    }
}

/// Load the document stored for `version`; its `version` field must agree
/// with the file name
async fn load_file(file: &File, version: &str) -> Result<ReleaseManifest, ManifestError> {
    let text = read_existing(file).await?;
    let manifest = parse_document(&text)?;

    if manifest.version != version {
        return Err(ManifestError::MalformedDocument(format!(
            "{} declares version '{}', expected '{}'",
            file.path().display(),
            manifest.version,
            version
        )));
    }
    Ok(manifest)
}

/// Read a document, mapping a missing file to `NotFound`
pub async fn read_existing(file: &File) -> Result<String, ManifestError> {
    match file.read_string().await {
        Ok(text) => Ok(text),
        Err(ManifestError::IoError(e)) if e.kind() == ErrorKind::NotFound => Err(
            ManifestError::NotFound(format!("manifest {}", file.path().display())),
        ),
        Err(e) => Err(e),
    }
}

/// Versions become file names, so only a conservative character set is allowed
pub fn check_version(version: &str) -> Result<(), ManifestError> {
    let valid = !version.is_empty()
        && !version.starts_with('.')
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'));

    if valid {
        Ok(())
    } else {
        Err(ManifestError::InvalidVersion(version.to_string()))
    }
}

fn check_immutable(stored: &ReleaseManifest, updated: &ReleaseManifest) -> Result<(), ManifestError> {
    let changed = if stored.version != updated.version {
        Some("version")
    } else if stored.created != updated.created {
        Some("created")
    } else if stored.created_by != updated.created_by {
        Some("createdBy")
    } else if stored.components != updated.components {
        Some("components")
    } else {
        None
    };

    match changed {
        Some(field) => Err(ManifestError::ImmutableField {
            version: stored.version.clone(),
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}
