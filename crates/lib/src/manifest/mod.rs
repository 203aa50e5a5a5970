//! Package manifests.
//!
//! A manifest (`packages.manifest.yaml`) lists the packages a build needs:
//!
//! ```yaml
//! packages_cache_folder: ./.cache
//! packages:
//!   - local: ${CUR_MANIFEST_FILE_DIR}/engine/core
//!   - git: https://example.com/org/widget.git
//!     tag: v1.2.0
//! ```
//!
//! Paths in a manifest are expanded (see [`expand`]) and resolved relative to
//! the manifest's own directory.

pub mod expand;
mod types;

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::MANIFEST_FILENAME;
pub use types::*;

/// Cache folder used when the manifest does not name one.
pub const DEFAULT_CACHE_FOLDER: &str = "./.cache";

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The manifest file does not exist.
  #[error("manifest file not found at {0}")]
  NotFound(PathBuf),

  /// Failed to read the manifest file.
  #[error("failed to read manifest file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The manifest is not valid YAML or has an invalid entry.
  #[error("failed to parse manifest file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
}

/// A loaded manifest together with the directory it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
  /// Path to the manifest file.
  pub path: PathBuf,
  /// Canonical directory containing the manifest.
  pub dir: PathBuf,
  pub file: ManifestFile,
}

impl Manifest {
  /// Load a manifest, defaulting to `packages.manifest.yaml` in the current
  /// directory.
  pub fn load(path: Option<&Path>) -> Result<Self, ManifestError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(MANIFEST_FILENAME));

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ManifestError::NotFound(path)),
      Err(e) => return Err(ManifestError::Read { path, source: e }),
    };

    let parent = match path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
      _ => PathBuf::from("."),
    };
    let dir = dunce::canonicalize(&parent).map_err(|e| ManifestError::Read {
      path: path.clone(),
      source: e,
    })?;

    let file = Self::parse(&content).map_err(|e| ManifestError::Parse {
      path: path.clone(),
      source: e,
    })?;

    debug!(path = %path.display(), packages = file.packages.len(), "loaded manifest");
    Ok(Self { path, dir, file })
  }

  /// Parse manifest content. A blank or comment-only document is an empty
  /// manifest.
  pub fn parse(content: &str) -> Result<ManifestFile, serde_yaml::Error> {
    if content.trim().is_empty() {
      return Ok(ManifestFile::default());
    }
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    if value.is_null() {
      return Ok(ManifestFile::default());
    }
    serde_yaml::from_value(value)
  }

  /// Build a manifest from already parsed content.
  pub fn from_file(file: ManifestFile, dir: impl Into<PathBuf>) -> Self {
    let dir = dir.into();
    Self {
      path: dir.join(MANIFEST_FILENAME),
      dir,
      file,
    }
  }

  pub fn packages(&self) -> &[PackageEntry] {
    &self.file.packages
  }

  /// Expand variables in `raw` and resolve it against the manifest directory.
  pub fn resolve_path(&self, raw: &str) -> PathBuf {
    let expanded = expand::expand_vars(raw, &self.dir.to_string_lossy());
    let path = PathBuf::from(expanded);
    let path = if path.is_absolute() { path } else { self.dir.join(path) };
    path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
  }

  /// Folder gathered package metadata is copied into.
  pub fn cache_dir(&self) -> PathBuf {
    let raw = self.file.packages_cache_folder.as_deref().unwrap_or(DEFAULT_CACHE_FOLDER);
    self.resolve_path(raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn load_reads_entries_and_dir() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("deps.yaml");
    fs::write(&path, "packages:\n  - local: ./core\n").unwrap();

    let manifest = Manifest::load(Some(&path)).unwrap();

    assert_eq!(manifest.dir, dunce::canonicalize(temp.path()).unwrap());
    assert_eq!(manifest.packages().len(), 1);
  }

  #[test]
  fn load_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let result = Manifest::load(Some(&temp.path().join("absent.yaml")));
    assert!(matches!(result, Err(ManifestError::NotFound(_))));
  }

  #[test]
  fn load_invalid_yaml_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.yaml");
    fs::write(&path, "packages: [unclosed\n").unwrap();

    let result = Manifest::load(Some(&path));

    assert!(matches!(result, Err(ManifestError::Parse { .. })));
  }

  #[test]
  fn blank_manifest_is_empty() {
    let file = Manifest::parse("  \n# nothing here\n").unwrap();
    assert!(file.packages.is_empty());
  }

  #[test]
  #[cfg(unix)]
  fn paths_resolve_against_manifest_dir() {
    let manifest = Manifest::from_file(ManifestFile::default(), "/work/project");

    assert_eq!(manifest.resolve_path("./engine"), PathBuf::from("/work/project/engine"));
    assert_eq!(manifest.resolve_path("engine/./core"), PathBuf::from("/work/project/engine/core"));
    assert_eq!(
      manifest.resolve_path("${CUR_MANIFEST_FILE_DIR}/engine"),
      PathBuf::from("/work/project/engine")
    );
    assert_eq!(manifest.resolve_path("/abs/pkg"), PathBuf::from("/abs/pkg"));
  }

  #[test]
  #[serial]
  #[cfg(unix)]
  fn env_vars_expand_in_paths() {
    let manifest = Manifest::from_file(ManifestFile::default(), "/work/project");
    temp_env::with_var("SRCDEP_TEST_PKGS", Some("/shared/pkgs"), || {
      assert_eq!(
        manifest.resolve_path("$SRCDEP_TEST_PKGS/math"),
        PathBuf::from("/shared/pkgs/math")
      );
    });
  }

  #[test]
  #[cfg(unix)]
  fn cache_dir_defaults_next_to_manifest() {
    let manifest = Manifest::from_file(ManifestFile::default(), "/work/project");
    assert_eq!(manifest.cache_dir(), PathBuf::from("/work/project/.cache"));

    let custom = ManifestFile {
      packages_cache_folder: Some("/var/cache/pkgs".to_string()),
      packages: Vec::new(),
    };
    let manifest = Manifest::from_file(custom, "/work/project");
    assert_eq!(manifest.cache_dir(), PathBuf::from("/var/cache/pkgs"));
  }
}
