//! Package metadata gathering.
//!
//! Copies each declared package's metadata file (`package.yaml` unless
//! [`GatherOptions::metadata_file`] says otherwise) into the manifest's cache
//! folder, keyed by the package name the metadata declares:
//!
//! ```text
//! <cache>/
//!   core/package.yaml
//!   widget/package.yaml
//! ```
//!
//! Unlike resolution, a bad entry does not abort the pass. Each entry gets an
//! [`EntryOutcome`] and the report carries the counts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::PACKAGE_METADATA_FILENAME;
use crate::manifest::{Manifest, PackageEntry};
use crate::package::{Identifier, PackageDecl};
use crate::resolve::fetch::is_populated;
use crate::roots::Roots;

/// Errors that abort gathering altogether.
#[derive(Debug, Error)]
pub enum GatherError {
  /// Failed to remove the cache folder.
  #[error("failed to clean cache directory '{path}': {source}")]
  Clean {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to create the cache folder.
  #[error("failed to create cache directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Reasons a metadata file is rejected.
#[derive(Debug, Error)]
pub enum MetadataError {
  #[error("{0} not found")]
  Missing(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("metadata file is empty")]
  Empty,

  #[error("YAML syntax error: {0}")]
  Syntax(#[source] serde_yaml::Error),

  #[error("metadata root must be a mapping, got {0}")]
  NotAMapping(&'static str),

  #[error("missing required field: 'name'")]
  MissingName,

  #[error("field 'name' must be a non-empty string")]
  InvalidName,

  #[error("package name '{0}' cannot be used as a directory name")]
  UnusableName(String),
}

/// Validated package metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
  pub name: Identifier,
}

/// Options for [`gather_packages`].
#[derive(Debug, Clone)]
pub struct GatherOptions {
  /// Remove the cache folder before gathering.
  pub clean: bool,
  /// Metadata file name looked up in each package and written to the cache.
  pub metadata_file: String,
}

impl Default for GatherOptions {
  fn default() -> Self {
    Self {
      clean: false,
      metadata_file: PACKAGE_METADATA_FILENAME.to_string(),
    }
  }
}

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryOutcome {
  Copied { name: String, dest: PathBuf },
  Skipped { reason: String },
  Failed { reason: String },
}

/// Outcome of one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatheredEntry {
  /// 1-based position in the manifest.
  pub index: usize,
  pub label: String,
  #[serde(flatten)]
  pub outcome: EntryOutcome,
}

/// Result of a gathering pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatherReport {
  pub cache_dir: PathBuf,
  pub entries: Vec<GatheredEntry>,
}

impl GatherReport {
  pub fn copied(&self) -> usize {
    self.count(|o| matches!(o, EntryOutcome::Copied { .. }))
  }

  pub fn skipped(&self) -> usize {
    self.count(|o| matches!(o, EntryOutcome::Skipped { .. }))
  }

  pub fn errors(&self) -> usize {
    self.count(|o| matches!(o, EntryOutcome::Failed { .. }))
  }

  fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
    self.entries.iter().filter(|e| pred(&e.outcome)).count()
  }
}

/// Validate a package metadata file and return its name.
pub fn verify_metadata(path: &Path) -> Result<PackageMetadata, MetadataError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(MetadataError::Missing(path.to_path_buf())),
    Err(e) => {
      return Err(MetadataError::Read {
        path: path.to_path_buf(),
        source: e,
      });
    }
  };

  if content.trim().is_empty() {
    return Err(MetadataError::Empty);
  }

  let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(MetadataError::Syntax)?;
  let mapping = match value {
    serde_yaml::Value::Mapping(m) => m,
    serde_yaml::Value::Null => return Err(MetadataError::Empty),
    other => return Err(MetadataError::NotAMapping(value_kind(&other))),
  };

  let name = match mapping.get("name") {
    None => return Err(MetadataError::MissingName),
    Some(serde_yaml::Value::String(s)) if !s.is_empty() => s.clone(),
    Some(_) => return Err(MetadataError::InvalidName),
  };

  let name = Identifier::new(name.clone()).map_err(|_| MetadataError::UnusableName(name))?;
  Ok(PackageMetadata { name })
}

fn value_kind(value: &serde_yaml::Value) -> &'static str {
  match value {
    serde_yaml::Value::Null => "null",
    serde_yaml::Value::Bool(_) => "bool",
    serde_yaml::Value::Number(_) => "number",
    serde_yaml::Value::String(_) => "string",
    serde_yaml::Value::Sequence(_) => "sequence",
    serde_yaml::Value::Mapping(_) => "mapping",
    serde_yaml::Value::Tagged(_) => "tagged value",
  }
}

/// Copy every package's metadata into the manifest's cache folder.
///
/// Git entries are gathered from their materialized source under
/// `roots.remote_sources` and skipped when not fetched yet.
pub fn gather_packages(manifest: &Manifest, roots: &Roots, options: GatherOptions) -> Result<GatherReport, GatherError> {
  let cache_dir = manifest.cache_dir();

  if options.clean && cache_dir.exists() {
    debug!(path = %cache_dir.display(), "cleaning cache directory");
    fs::remove_dir_all(&cache_dir).map_err(|e| GatherError::Clean {
      path: cache_dir.clone(),
      source: e,
    })?;
  }
  fs::create_dir_all(&cache_dir).map_err(|e| GatherError::CreateDir {
    path: cache_dir.clone(),
    source: e,
  })?;

  let total = manifest.packages().len();
  info!(count = total, cache = %cache_dir.display(), "gathering package metadata");

  let mut report = GatherReport {
    cache_dir,
    entries: Vec::with_capacity(total),
  };

  for (idx, entry) in manifest.packages().iter().enumerate() {
    let outcome = match package_dir(manifest, roots, entry) {
      Ok(Some(dir)) => copy_metadata(&dir, &options.metadata_file, &report.cache_dir, &report.entries),
      Ok(None) => EntryOutcome::Skipped {
        reason: "git source not fetched".to_string(),
      },
      Err(reason) => EntryOutcome::Failed { reason },
    };

    match &outcome {
      EntryOutcome::Copied { name, .. } => info!(index = idx + 1, total, name = %name, "gathered"),
      EntryOutcome::Skipped { reason } => debug!(index = idx + 1, total, reason = %reason, "skipped"),
      EntryOutcome::Failed { reason } => warn!(index = idx + 1, total, reason = %reason, "failed"),
    }

    report.entries.push(GatheredEntry {
      index: idx + 1,
      label: entry.label().to_string(),
      outcome,
    });
  }

  Ok(report)
}

/// Directory holding the entry's metadata, `None` for unfetched git sources.
fn package_dir(manifest: &Manifest, roots: &Roots, entry: &PackageEntry) -> Result<Option<PathBuf>, String> {
  match entry {
    PackageEntry::Local { path, .. } => {
      let dir = manifest.resolve_path(path);
      if !dir.exists() {
        return Err(format!("package folder not found: {}", dir.display()));
      }
      Ok(Some(dir))
    }
    PackageEntry::Git { url, tag, name } => {
      let mut decl = PackageDecl::new(url.as_str(), tag.as_str());
      if let Some(name) = name {
        decl = decl.with_name(name.as_str());
      }
      let id = decl.identifier().map_err(|e| e.to_string())?;
      let dir = roots.source_dir(&id);
      match is_populated(&dir) {
        Ok(true) => Ok(Some(dir)),
        Ok(false) => Ok(None),
        Err(e) => Err(e.to_string()),
      }
    }
  }
}

fn copy_metadata(dir: &Path, file_name: &str, cache_dir: &Path, previous: &[GatheredEntry]) -> EntryOutcome {
  let source = dir.join(file_name);
  let metadata = match verify_metadata(&source) {
    Ok(metadata) => metadata,
    Err(MetadataError::Missing(_)) => {
      return EntryOutcome::Failed {
        reason: format!("{} not found in: {}", file_name, dir.display()),
      };
    }
    Err(e) => {
      return EntryOutcome::Failed {
        reason: format!("invalid {}: {}", file_name, e),
      };
    }
  };

  let name = metadata.name.to_string();
  let already = previous
    .iter()
    .any(|e| matches!(&e.outcome, EntryOutcome::Copied { name: n, .. } if *n == name));
  if already {
    warn!(name = %name, "package gathered more than once, overwriting");
  }

  let dest_dir = cache_dir.join(metadata.name.as_str());
  let dest = dest_dir.join(file_name);
  let copied = fs::create_dir_all(&dest_dir).and_then(|_| fs::copy(&source, &dest));
  match copied {
    Ok(_) => EntryOutcome::Copied { name, dest },
    Err(e) => EntryOutcome::Failed {
      reason: format!("failed to copy {}: {}", source.display(), e),
    },
  }
}
