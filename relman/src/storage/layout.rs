//! Storage layout configuration

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Default settings file name inside the base directory
pub const SETTINGS_FILE: &str = "relman.json";

/// Where relman finds its settings and manifest store
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory; relative paths in the settings resolve against it
    pub base_dir: PathBuf,

    settings_file: PathBuf,
}

impl StorageLayout {
    /// Layout rooted at a directory, with the settings file inside it
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let settings_file = base_dir.join(SETTINGS_FILE);
        Self {
            base_dir,
            settings_file,
        }
    }

    /// Layout driven by an explicit settings file; its directory becomes the base
    pub fn from_settings_path(path: impl Into<PathBuf>) -> Self {
        let settings_file = path.into();
        let base_dir = settings_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            base_dir,
            settings_file,
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(&self.settings_file)
    }

    /// Resolve the manifest directory named in the settings
    pub fn manifests_dir(&self, configured: &Path) -> Dir {
        Dir::new(self.base_dir.join(configured))
    }

    /// Resolve a log file named in the settings
    pub fn resolve(&self, configured: &Path) -> PathBuf {
        self.base_dir.join(configured)
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
