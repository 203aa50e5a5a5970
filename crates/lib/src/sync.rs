//! Resolve every package a manifest declares.
//!
//! Entries are processed in order: git entries go through the
//! [`RemoteResolver`], local entries through the [`LocalRegistrar`]
//! (`include: true` incorporates them as subprojects). The first failure
//! aborts the pass; there are no partial results.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::manifest::{Manifest, PackageEntry};
use crate::package::{PackageDecl, ResolvedPackage};
use crate::resolve::{LocalRegistrar, RegisterError, RemoteResolver, ResolveError, SourceFetcher, Subprojects};

/// Errors that abort a sync.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("package #{index} ({url}): {source}")]
  Remote {
    index: usize,
    url: String,
    #[source]
    source: ResolveError,
  },

  #[error("package #{index} ({}): {source}", path.display())]
  Local {
    index: usize,
    path: PathBuf,
    #[source]
    source: RegisterError,
  },
}

/// Everything a sync resolved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
  /// Resolved packages in manifest order.
  pub packages: Vec<ResolvedPackage>,
  /// Local packages incorporated as subprojects.
  pub subprojects: Subprojects,
}

/// Resolve all manifest entries.
pub fn sync_manifest<F: SourceFetcher>(
  manifest: &Manifest,
  remote: &RemoteResolver<'_, F>,
  local: &LocalRegistrar<'_>,
) -> Result<SyncOutcome, SyncError> {
  let mut outcome = SyncOutcome::default();
  let total = manifest.packages().len();

  info!(count = total, manifest = %manifest.path.display(), "syncing packages");

  for (idx, entry) in manifest.packages().iter().enumerate() {
    let index = idx + 1;
    let pkg = match entry {
      PackageEntry::Git { url, tag, name } => {
        let mut decl = PackageDecl::new(url.as_str(), tag.as_str());
        if let Some(name) = name {
          decl = decl.with_name(name.as_str());
        }
        remote.resolve_decl(&decl).map_err(|source| SyncError::Remote {
          index,
          url: url.clone(),
          source,
        })?
      }
      PackageEntry::Local { path, include } => {
        let dir = manifest.resolve_path(path);
        let result = if *include {
          local.incorporate_local(&dir, &mut outcome.subprojects)
        } else {
          local.register_local(&dir)
        };
        result.map_err(|source| SyncError::Local {
          index,
          path: dir.clone(),
          source,
        })?
      }
    };

    info!(index, total, name = %pkg.identifier, "package ready");
    outcome.packages.push(pkg);
  }

  Ok(outcome)
}
