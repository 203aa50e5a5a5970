//! Local package registration.
//!
//! A directory is a valid local package iff it directly contains the build
//! descriptor file. Two operations are offered:
//!
//! - [`LocalRegistrar::register_local`] only validates and reports the path
//! - [`LocalRegistrar::incorporate_local`] additionally adds the directory to
//!   a [`Subprojects`] list with its own binary directory
//!
//! The descriptor check is not repeated later, so a directory mutated after
//! registration is not noticed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DEFAULT_BUILD_DESCRIPTOR;
use crate::package::{PackageOrigin, ResolvedPackage};
use crate::roots::{Roots, RootsError, make_absolute};

/// Errors that can occur while registering a local package.
#[derive(Debug, Error)]
pub enum RegisterError {
  /// The directory does not exist.
  #[error("package directory {dir} not found (expected {descriptor} inside)")]
  NotFound { dir: PathBuf, descriptor: String },

  /// The path exists but is not a directory.
  #[error("package path is not a directory: {0}")]
  NotADirectory(PathBuf),

  /// Failed to inspect the directory.
  #[error("failed to inspect '{path}': {source}")]
  Inspect {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The directory has no build descriptor.
  #[error("{descriptor} not found in package directory {dir}")]
  MissingDescriptor { dir: PathBuf, descriptor: String },

  /// The directory has no final component to name it by.
  #[error("cannot name package at '{0}'")]
  Unnamed(PathBuf),

  /// The path could not be made absolute.
  #[error(transparent)]
  Path(#[from] RootsError),

  /// A subproject with this name was already incorporated.
  #[error("subproject '{name}' already incorporated from {existing}")]
  DuplicateSubproject { name: String, existing: PathBuf },
}

/// A local package structurally added to the active build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subproject {
  pub name: String,
  pub source_dir: PathBuf,
  /// Where the subproject's build output goes.
  pub binary_dir: PathBuf,
}

/// Subprojects incorporated during one configuration pass, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Subprojects {
  entries: Vec<Subproject>,
}

impl Subprojects {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a subproject. Names must be unique.
  pub fn add(&mut self, subproject: Subproject) -> Result<(), RegisterError> {
    if let Some(existing) = self.get(&subproject.name) {
      return Err(RegisterError::DuplicateSubproject {
        name: subproject.name,
        existing: existing.source_dir.clone(),
      });
    }
    self.entries.push(subproject);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&Subproject> {
    self.entries.iter().find(|s| s.name == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Subproject> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Registers local source directories.
pub struct LocalRegistrar<'a> {
  roots: &'a Roots,
  descriptor: String,
}

impl<'a> LocalRegistrar<'a> {
  /// Create a registrar expecting the default build descriptor.
  pub fn new(roots: &'a Roots) -> Self {
    Self {
      roots,
      descriptor: DEFAULT_BUILD_DESCRIPTOR.to_string(),
    }
  }

  pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
    self.descriptor = descriptor.into();
    self
  }

  pub fn descriptor(&self) -> &str {
    &self.descriptor
  }

  /// Validate `dir` and register it as a package without incorporating it.
  ///
  /// The directory itself is the package's source location and identifier.
  ///
  /// # Errors
  ///
  /// Returns [`RegisterError::MissingDescriptor`] naming both the directory
  /// and the descriptor file when the descriptor is absent.
  pub fn register_local(&self, dir: impl AsRef<Path>) -> Result<ResolvedPackage, RegisterError> {
    let source_dir = make_absolute(dir.as_ref())?;
    self.check_descriptor(&source_dir)?;

    let name = package_name(&source_dir)?;
    let pkg = ResolvedPackage {
      identifier: source_dir.display().to_string(),
      build_dir: self.roots.build_dir(&name),
      install_dir: self.roots.install_dir(&name),
      source_dir,
      origin: PackageOrigin::Local,
    };

    info!(path = %pkg.source_dir.display(), "registered local package");
    Ok(pkg)
  }

  /// Register `dir` and add it to `subprojects` with a binary directory
  /// under the build root.
  pub fn incorporate_local(
    &self,
    dir: impl AsRef<Path>,
    subprojects: &mut Subprojects,
  ) -> Result<ResolvedPackage, RegisterError> {
    let pkg = self.register_local(dir)?;
    let name = package_name(&pkg.source_dir)?;

    subprojects.add(Subproject {
      binary_dir: pkg.build_dir.clone(),
      source_dir: pkg.source_dir.clone(),
      name: name.clone(),
    })?;

    info!(name = %name, binary = %pkg.build_dir.display(), "incorporated subproject");
    Ok(pkg)
  }

  fn check_descriptor(&self, dir: &Path) -> Result<(), RegisterError> {
    let meta = match fs::metadata(dir) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(RegisterError::NotFound {
          dir: dir.to_path_buf(),
          descriptor: self.descriptor.clone(),
        });
      }
      Err(e) => {
        return Err(RegisterError::Inspect {
          path: dir.to_path_buf(),
          source: e,
        });
      }
    };
    if !meta.is_dir() {
      return Err(RegisterError::NotADirectory(dir.to_path_buf()));
    }

    let descriptor = dir.join(&self.descriptor);
    debug!(path = %descriptor.display(), "checking build descriptor");
    if !descriptor.is_file() {
      return Err(RegisterError::MissingDescriptor {
        dir: dir.to_path_buf(),
        descriptor: self.descriptor.clone(),
      });
    }
    Ok(())
  }
}

/// Final component of the canonical path, used to key build and install
/// directories. `dir` must exist.
fn package_name(dir: &Path) -> Result<String, RegisterError> {
  let canonical = dunce::canonicalize(dir).map_err(|source| RegisterError::Inspect {
    path: dir.to_path_buf(),
    source,
  })?;
  canonical
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .filter(|n| !n.is_empty())
    .ok_or_else(|| RegisterError::Unnamed(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn roots_in(temp: &TempDir) -> Roots {
    Roots::new(
      temp.path().join("src"),
      temp.path().join("build"),
      temp.path().join("install"),
    )
    .unwrap()
  }

  fn package_dir(temp: &TempDir, name: &str, descriptor: Option<&str>) -> PathBuf {
    let dir = temp.path().join("pkgs").join(name);
    fs::create_dir_all(&dir).unwrap();
    if let Some(descriptor) = descriptor {
      fs::write(dir.join(descriptor), "project(x)\n").unwrap();
    }
    dir
  }

  mod register {
    use super::*;

    #[test]
    fn dir_with_descriptor_is_returned_unchanged() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "foo", Some("CMakeLists.txt"));

      let pkg = LocalRegistrar::new(&roots).register_local(&dir).unwrap();

      assert_eq!(pkg.source_dir, dir);
      assert_eq!(pkg.identifier, dir.display().to_string());
      assert_eq!(pkg.build_dir, temp.path().join("build").join("foo"));
      assert_eq!(pkg.install_dir, temp.path().join("install").join("foo"));
      assert_eq!(pkg.origin, PackageOrigin::Local);
    }

    #[test]
    fn missing_descriptor_names_dir_and_file() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "foo", None);

      let err = LocalRegistrar::new(&roots).register_local(&dir).unwrap_err();

      assert!(matches!(err, RegisterError::MissingDescriptor { .. }));
      let msg = err.to_string();
      assert!(msg.contains("CMakeLists.txt"));
      assert!(msg.contains(&dir.display().to_string()));
    }

    #[test]
    #[cfg(unix)]
    fn missing_descriptor_under_absolute_path() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);

      let err = LocalRegistrar::new(&roots).register_local("/pkgs/foo").unwrap_err();

      let msg = err.to_string();
      assert!(msg.contains("/pkgs/foo"));
      assert!(msg.contains("CMakeLists.txt"));
    }

    #[test]
    fn descriptor_in_subdirectory_does_not_count() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "foo", None);
      fs::create_dir_all(dir.join("src")).unwrap();
      fs::write(dir.join("src").join("CMakeLists.txt"), "").unwrap();

      let result = LocalRegistrar::new(&roots).register_local(&dir);

      assert!(matches!(result, Err(RegisterError::MissingDescriptor { .. })));
    }

    #[test]
    fn descriptor_must_be_a_file() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "foo", None);
      fs::create_dir_all(dir.join("CMakeLists.txt")).unwrap();

      let result = LocalRegistrar::new(&roots).register_local(&dir);

      assert!(matches!(result, Err(RegisterError::MissingDescriptor { .. })));
    }

    #[test]
    fn nonexistent_dir_is_not_found() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);

      let result = LocalRegistrar::new(&roots).register_local(temp.path().join("nope"));

      assert!(matches!(result, Err(RegisterError::NotFound { .. })));
    }

    #[test]
    fn file_is_not_a_directory() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let file = temp.path().join("file");
      fs::write(&file, "").unwrap();

      let result = LocalRegistrar::new(&roots).register_local(&file);

      assert!(matches!(result, Err(RegisterError::NotADirectory(_))));
    }

    #[test]
    fn parent_components_are_named_by_their_target() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "foo", Some("CMakeLists.txt"));
      fs::create_dir_all(dir.join("sub")).unwrap();
      let dotted = dir.join("sub").join("..");

      let pkg = LocalRegistrar::new(&roots).register_local(&dotted).unwrap();

      assert_eq!(pkg.source_dir, dotted);
      assert_eq!(pkg.build_dir, temp.path().join("build").join("foo"));
      assert_eq!(pkg.install_dir, temp.path().join("install").join("foo"));
    }

    #[test]
    fn custom_descriptor() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "foo", Some("meson.build"));

      let registrar = LocalRegistrar::new(&roots).with_descriptor("meson.build");

      assert_eq!(registrar.descriptor(), "meson.build");
      assert!(registrar.register_local(&dir).is_ok());
      assert!(LocalRegistrar::new(&roots).register_local(&dir).is_err());
    }
  }

  mod incorporate {
    use super::*;

    #[test]
    fn adds_subproject_with_binary_dir() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "math", Some("CMakeLists.txt"));
      let mut subprojects = Subprojects::new();

      let pkg = LocalRegistrar::new(&roots)
        .incorporate_local(&dir, &mut subprojects)
        .unwrap();

      assert_eq!(pkg.source_dir, dir);
      assert_eq!(subprojects.len(), 1);
      let sub = subprojects.get("math").unwrap();
      assert_eq!(sub.source_dir, dir);
      assert_eq!(sub.binary_dir, temp.path().join("build").join("math"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let first = package_dir(&temp, "math", Some("CMakeLists.txt"));
      let second = temp.path().join("other").join("math");
      fs::create_dir_all(&second).unwrap();
      fs::write(second.join("CMakeLists.txt"), "").unwrap();
      let registrar = LocalRegistrar::new(&roots);
      let mut subprojects = Subprojects::new();

      registrar.incorporate_local(&first, &mut subprojects).unwrap();
      let err = registrar.incorporate_local(&second, &mut subprojects).unwrap_err();

      assert!(matches!(err, RegisterError::DuplicateSubproject { ref existing, .. } if *existing == first));
      assert_eq!(subprojects.len(), 1);
    }

    #[test]
    fn failed_registration_adds_nothing() {
      let temp = TempDir::new().unwrap();
      let roots = roots_in(&temp);
      let dir = package_dir(&temp, "math", None);
      let mut subprojects = Subprojects::new();

      assert!(
        LocalRegistrar::new(&roots)
          .incorporate_local(&dir, &mut subprojects)
          .is_err()
      );
      assert!(subprojects.is_empty());
    }
  }
}
