//! Remote package resolution.
//!
//! Resolving a remote package:
//! 1. Derive the identifier from the repository URL (or take the supplied one)
//! 2. Compute `<root>/<id>` for source, build and install
//! 3. Fetch into the source directory unless it is already populated

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use super::fetch::{FetchError, GitFetcher, SourceFetcher, is_populated};
use crate::package::{IdentifierError, PackageDecl, PackageOrigin, ResolvedPackage};
use crate::roots::{Roots, RootsError, make_absolute};

/// Errors that can occur while resolving a remote package.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// No identifier could be derived from the repository location.
  #[error("cannot derive a package name from '{repository}': {source}")]
  Identifier {
    repository: String,
    #[source]
    source: IdentifierError,
  },

  /// The revision reference is empty.
  #[error("package '{name}' has an empty revision")]
  EmptyRevision { name: String },

  /// A directory override could not be made absolute.
  #[error("invalid directory for package '{name}': {source}")]
  Path {
    name: String,
    #[source]
    source: RootsError,
  },

  /// Fetching the source failed.
  #[error("failed to fetch package '{name}': {source}")]
  Fetch {
    name: String,
    #[source]
    source: FetchError,
  },
}

/// Resolves remote packages against a set of [`Roots`].
pub struct RemoteResolver<'a, F = GitFetcher> {
  roots: &'a Roots,
  fetcher: F,
}

impl<'a> RemoteResolver<'a, GitFetcher> {
  /// Create a resolver that fetches with git.
  pub fn new(roots: &'a Roots) -> Self {
    Self::with_fetcher(roots, GitFetcher::default())
  }
}

impl<'a, F: SourceFetcher> RemoteResolver<'a, F> {
  pub fn with_fetcher(roots: &'a Roots, fetcher: F) -> Self {
    Self { roots, fetcher }
  }

  /// Resolve `repository` at `revision` using the default directories.
  ///
  /// # Errors
  ///
  /// Returns [`ResolveError`] if:
  /// - No identifier can be derived from `repository` (nothing is fetched)
  /// - `revision` is empty
  /// - The fetch fails
  ///
  /// `revision` is a branch, a tag or a full commit hash. Abbreviated hashes
  /// are requested as ref names and fail to fetch.
  pub fn resolve_remote(&self, repository: &str, revision: &str) -> Result<ResolvedPackage, ResolveError> {
    self.resolve_decl(&PackageDecl::new(repository, revision))
  }

  /// Resolve a full declaration, honoring its identifier and directory overrides.
  pub fn resolve_decl(&self, decl: &PackageDecl) -> Result<ResolvedPackage, ResolveError> {
    let id = decl.identifier().map_err(|source| ResolveError::Identifier {
      repository: decl.repository.clone(),
      source,
    })?;
    let name = id.to_string();

    if decl.revision.trim().is_empty() {
      return Err(ResolveError::EmptyRevision { name });
    }

    let source_dir = self.dir_or(&name, decl.source_dir.as_ref(), || self.roots.source_dir(&id))?;
    let build_dir = self.dir_or(&name, decl.build_dir.as_ref(), || self.roots.build_dir(&name))?;
    let install_dir = self.dir_or(&name, decl.install_dir.as_ref(), || self.roots.install_dir(&name))?;

    let populated = is_populated(&source_dir).map_err(|source| ResolveError::Fetch {
      name: name.clone(),
      source,
    })?;

    if populated {
      debug!(name = %name, path = %source_dir.display(), "source already populated, skipping fetch");
    } else {
      info!(name = %name, url = %decl.repository, rev = %decl.revision, "fetching package");
      self
        .fetcher
        .fetch(&decl.repository, &decl.revision, &source_dir)
        .map_err(|source| ResolveError::Fetch {
          name: name.clone(),
          source,
        })?;
    }

    info!(
      name = %name,
      source = %source_dir.display(),
      build = %build_dir.display(),
      install = %install_dir.display(),
      "resolved remote package"
    );

    Ok(ResolvedPackage {
      identifier: name,
      source_dir,
      build_dir,
      install_dir,
      origin: PackageOrigin::Remote {
        url: decl.repository.clone(),
        rev: decl.revision.clone(),
      },
    })
  }

  fn dir_or(
    &self,
    name: &str,
    custom: Option<&PathBuf>,
    default: impl FnOnce() -> PathBuf,
  ) -> Result<PathBuf, ResolveError> {
    match custom {
      Some(dir) => make_absolute(dir).map_err(|source| ResolveError::Path {
        name: name.to_string(),
        source,
      }),
      None => Ok(default()),
    }
  }
}
