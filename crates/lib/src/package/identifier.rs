//! Package identifiers and their derivation from repository locations.
//!
//! An identifier is the last non-empty path segment of a repository URL with
//! one recognized archive suffix stripped:
//!
//! ```text
//! https://example.com/org/widget.git   -> widget
//! git@example.com:org/gadget           -> gadget
//! https://example.com/dl/lib.tar.gz    -> lib
//! ```

use std::fmt;

use gix::bstr::{BStr, ByteSlice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffixes stripped from the final path segment, longest first.
pub const ARCHIVE_SUFFIXES: &[&str] = &[
  ".tar.bz2", ".tar.zst", ".tar.gz", ".tar.xz", ".tbz2", ".tgz", ".txz", ".tar", ".zip", ".git",
];

/// Errors raised when an identifier cannot be derived or validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
  /// The repository location is empty.
  #[error("repository location is empty")]
  EmptyLocation,

  /// The repository location is not a valid URL.
  #[error("'{location}' is not a valid repository location: {reason}")]
  InvalidLocation { location: String, reason: String },

  /// The URL path has no segment to name the package after.
  #[error("'{location}' has no final path segment to derive a package name from")]
  NoPathSegment { location: String },

  /// The identifier is empty (possibly after stripping a suffix).
  #[error("package identifier is empty")]
  Empty,

  /// The identifier would escape its root directory.
  #[error("'{0}' is not a valid package identifier")]
  Invalid(String),
}

/// A validated package identifier.
///
/// Always non-empty, never `.` or `..`, and never contains a path separator,
/// so joining it onto a root stays inside that root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
  /// Validate a supplied identifier.
  pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
    let name = name.into();
    if name.is_empty() {
      return Err(IdentifierError::Empty);
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
      return Err(IdentifierError::Invalid(name));
    }
    Ok(Self(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for Identifier {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl TryFrom<String> for Identifier {
  type Error = IdentifierError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Identifier> for String {
  fn from(id: Identifier) -> Self {
    id.0
  }
}

/// Derive a package identifier from a repository location.
///
/// Accepts anything git accepts as a remote: `https://`, `ssh://`, scp-like
/// `user@host:path`, `file://` and plain paths.
pub fn derive_identifier(location: &str) -> Result<Identifier, IdentifierError> {
  let trimmed = location.trim();
  if trimmed.is_empty() {
    return Err(IdentifierError::EmptyLocation);
  }

  let url = gix::url::parse(BStr::new(trimmed)).map_err(|e| IdentifierError::InvalidLocation {
    location: trimmed.to_string(),
    reason: e.to_string(),
  })?;

  let path = url.path.to_str_lossy();
  let segment = last_segment(&path).ok_or_else(|| IdentifierError::NoPathSegment {
    location: trimmed.to_string(),
  })?;

  Identifier::new(strip_archive_suffix(segment))
}

/// Last non-empty path segment, ignoring any query or fragment.
fn last_segment(path: &str) -> Option<&str> {
  let path = path.split(['?', '#']).next().unwrap_or_default();
  path.split(['/', '\\']).rev().find(|s| !s.is_empty())
}

/// Strip the longest recognized archive suffix, case-insensitively.
pub fn strip_archive_suffix(segment: &str) -> &str {
  let lower = segment.to_ascii_lowercase();
  ARCHIVE_SUFFIXES
    .iter()
    .find(|suffix| lower.ends_with(*suffix))
    .map(|suffix| &segment[..segment.len() - suffix.len()])
    .unwrap_or(segment)
}
