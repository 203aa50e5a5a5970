//! Package declaration and resolution types.

use std::path::PathBuf;

use serde::Serialize;

use super::identifier::{Identifier, IdentifierError, derive_identifier};

/// A request to acquire a remote package.
///
/// Only the repository and revision are required. The identifier is derived
/// from the repository when not supplied, and the directories default to the
/// configured roots joined with the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDecl {
  /// Identifier override. Validated when the declaration is resolved.
  pub name: Option<String>,
  /// Repository location (git URL or path).
  pub repository: String,
  /// Branch, tag or commit hash.
  pub revision: String,
  pub source_dir: Option<PathBuf>,
  pub build_dir: Option<PathBuf>,
  pub install_dir: Option<PathBuf>,
}

impl PackageDecl {
  pub fn new(repository: impl Into<String>, revision: impl Into<String>) -> Self {
    Self {
      name: None,
      repository: repository.into(),
      revision: revision.into(),
      source_dir: None,
      build_dir: None,
      install_dir: None,
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.source_dir = Some(dir.into());
    self
  }

  pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.build_dir = Some(dir.into());
    self
  }

  pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.install_dir = Some(dir.into());
    self
  }

  /// The supplied identifier if any, otherwise one derived from the repository.
  pub fn identifier(&self) -> Result<Identifier, IdentifierError> {
    match &self.name {
      Some(name) => Identifier::new(name.clone()),
      None => derive_identifier(&self.repository),
    }
  }
}

/// Where a resolved package came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PackageOrigin {
  /// Fetched from a repository at a revision.
  Remote { url: String, rev: String },
  /// Registered from a local directory.
  Local,
}

/// A package whose source location is known and usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
  /// Identifier for remote packages, the directory path for local ones.
  pub identifier: String,
  pub source_dir: PathBuf,
  pub build_dir: PathBuf,
  pub install_dir: PathBuf,
  pub origin: PackageOrigin,
}

impl ResolvedPackage {
  pub fn is_remote(&self) -> bool {
    matches!(self.origin, PackageOrigin::Remote { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifier_is_derived_when_not_supplied() {
    let decl = PackageDecl::new("https://example.com/org/widget.git", "v1.2.0");
    assert_eq!(decl.identifier().unwrap().as_str(), "widget");
  }

  #[test]
  fn supplied_identifier_wins() {
    let decl = PackageDecl::new("https://example.com/org/widget.git", "main").with_name("widget-fork");
    assert_eq!(decl.identifier().unwrap().as_str(), "widget-fork");
  }

  #[test]
  fn supplied_identifier_is_validated() {
    let decl = PackageDecl::new("https://example.com/org/widget.git", "main").with_name("../escape");
    assert!(decl.identifier().is_err());
  }

  #[test]
  fn origin_serializes_tagged() {
    let pkg = ResolvedPackage {
      identifier: "widget".to_string(),
      source_dir: PathBuf::from("/s/widget"),
      build_dir: PathBuf::from("/b/widget"),
      install_dir: PathBuf::from("/i/widget"),
      origin: PackageOrigin::Remote {
        url: "https://example.com/org/widget.git".to_string(),
        rev: "v1.2.0".to_string(),
      },
    };
    let json = serde_json::to_value(&pkg).unwrap();
    assert_eq!(json["origin"]["type"], "remote");
    assert_eq!(json["origin"]["rev"], "v1.2.0");
    assert!(pkg.is_remote());
  }
}
