//! Manifest file types.

use serde::Deserialize;

/// Raw manifest document as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestFile {
  /// Folder gathered package metadata is copied into.
  #[serde(default, alias = "pachages_cache_folder")]
  pub packages_cache_folder: Option<String>,

  /// Package entries, resolved in order.
  #[serde(default)]
  pub packages: Vec<PackageEntry>,
}

/// One declared package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawEntry")]
pub enum PackageEntry {
  /// A directory that already contains buildable source.
  ///
  /// ```yaml
  /// - local: ${CUR_MANIFEST_FILE_DIR}/engine/core
  ///   include: true
  /// ```
  Local {
    /// Path as written, before variable expansion.
    path: String,
    /// Structurally incorporate as a subproject instead of only registering.
    include: bool,
  },

  /// A git repository pinned to a revision.
  ///
  /// ```yaml
  /// - git: https://example.com/org/widget.git
  ///   tag: v1.2.0
  /// ```
  Git {
    url: String,
    tag: String,
    /// Identifier override.
    name: Option<String>,
  },
}

impl PackageEntry {
  /// Short human-readable label for diagnostics.
  pub fn label(&self) -> &str {
    match self {
      PackageEntry::Local { path, .. } => path,
      PackageEntry::Git { url, .. } => url,
    }
  }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
  local: Option<String>,
  git: Option<String>,
  tag: Option<String>,
  name: Option<String>,
  #[serde(default)]
  include: bool,
}

impl TryFrom<RawEntry> for PackageEntry {
  type Error = String;

  fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
    match (raw.local, raw.git) {
      (Some(path), None) => {
        if raw.tag.is_some() || raw.name.is_some() {
          return Err(format!("local entry '{}' does not take 'tag' or 'name'", path));
        }
        Ok(PackageEntry::Local {
          path,
          include: raw.include,
        })
      }
      (None, Some(url)) => {
        if raw.include {
          return Err(format!("git entry '{}' cannot be included directly", url));
        }
        let tag = raw.tag.ok_or_else(|| format!("git entry '{}' is missing 'tag'", url))?;
        Ok(PackageEntry::Git {
          url,
          tag,
          name: raw.name,
        })
      }
      (Some(_), Some(_)) => Err("entry has both 'local' and 'git'".to_string()),
      (None, None) => Err("entry needs either 'local' or 'git'".to_string()),
    }
  }
}
