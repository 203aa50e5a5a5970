//! Shallow git fetch into a package's source directory.
//!
//! This module handles:
//! - Deciding whether a source directory is already populated
//! - Shallow-cloning a branch or tag (`depth = 1`)
//! - Cloning and detaching HEAD at a full commit hash, which cannot be
//!   requested by ref name
//!
//! A populated directory is never fetched again, so a moved branch or
//! re-pointed tag is not picked up on later runs.
//!
//! Abbreviated commit hashes are not supported: anything that is not a full
//! 40 or 64 character object id is requested as a ref name and fails when
//! the remote has no such ref.

use std::fs;
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use gix::refs::transaction::{Change, LogChange, PreviousValue, RefEdit, RefLog};
use gix::remote::fetch::Shallow;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Failed to create the parent of the source directory.
  #[error("failed to create directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] io::Error),

  /// Failed to inspect the source directory.
  #[error("failed to inspect '{0}': {1}")]
  Inspect(PathBuf, #[source] io::Error),

  /// Failed to clone a git repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The revision is not a valid ref name.
  #[error("'{rev}' is not a valid revision: {source}")]
  InvalidRevision {
    rev: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The revision does not exist in the fetched repository.
  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  /// Failed to checkout a revision.
  #[error("failed to checkout revision '{rev}': {source}")]
  Checkout {
    rev: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

/// Something that can materialize `url` at `rev` into `dest`.
///
/// `dest` is missing or empty when `fetch` is called. On success it must
/// contain the revision's tree.
pub trait SourceFetcher {
  fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<(), FetchError>;
}

impl<F: SourceFetcher + ?Sized> SourceFetcher for &F {
  fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<(), FetchError> {
    (**self).fetch(url, rev, dest)
  }
}

/// History depth fetched for branches and tags.
pub const SHALLOW_DEPTH: NonZeroU32 = NonZeroU32::MIN;

/// Fetches sources with gix.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitFetcher;

impl GitFetcher {
  pub fn new() -> Self {
    Self
  }
}

impl SourceFetcher for GitFetcher {
  fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<(), FetchError> {
    if let Some(parent) = dest.parent()
      && !parent.exists()
    {
      fs::create_dir_all(parent).map_err(|e| FetchError::CreateDir(parent.to_path_buf(), e))?;
    }

    if is_commit_hash(rev) {
      info!(url, rev, path = %dest.display(), "cloning repository at commit");
      clone_at_commit(url, rev, dest)
    } else {
      info!(url, rev, depth = SHALLOW_DEPTH.get(), path = %dest.display(), "shallow cloning repository");
      shallow_clone(url, rev, dest, SHALLOW_DEPTH)
    }
  }
}

/// Whether `dir` exists and has at least one entry.
pub fn is_populated(dir: &Path) -> Result<bool, FetchError> {
  match fs::read_dir(dir) {
    Ok(mut entries) => Ok(entries.next().is_some()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(FetchError::Inspect(dir.to_path_buf(), e)),
  }
}

/// Full SHA-1 or SHA-256 object id.
pub fn is_commit_hash(rev: &str) -> bool {
  matches!(rev.len(), 40 | 64) && rev.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Clone only the tip of a branch or tag.
fn shallow_clone(url: &str, rev: &str, dest: &Path, depth: NonZeroU32) -> Result<(), FetchError> {
  let mut prepared = gix::prepare_clone(url, dest)
    .map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .with_shallow(Shallow::DepthAtRemote(depth))
    .with_ref_name(Some(rev))
    .map_err(|e| FetchError::InvalidRevision {
      rev: rev.to_string(),
      source: Box::new(e),
    })?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Checkout {
      rev: rev.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

/// Clone the default branch's history, then check out `rev` on a detached HEAD.
fn clone_at_commit(url: &str, rev: &str, dest: &Path) -> Result<(), FetchError> {
  let mut prepared = gix::prepare_clone(url, dest).map_err(|e| FetchError::Clone {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let id = gix::ObjectId::from_hex(rev.as_bytes()).map_err(|e| FetchError::InvalidRevision {
    rev: rev.to_string(),
    source: Box::new(e),
  })?;

  detach_head(checkout.repo(), id, rev)?;

  checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Checkout {
      rev: rev.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

/// Point HEAD directly at `id` so the worktree checkout uses that commit.
fn detach_head(repo: &gix::Repository, id: gix::ObjectId, rev: &str) -> Result<(), FetchError> {
  let commit = repo
    .find_object(id)
    .map_err(|_| FetchError::RevisionNotFound { rev: rev.to_string() })?;
  commit
    .try_into_commit()
    .map_err(|_| FetchError::RevisionNotFound { rev: rev.to_string() })?;

  debug!(rev, "detaching HEAD");
  let name = gix::refs::FullName::try_from("HEAD").map_err(|e| FetchError::Checkout {
    rev: rev.to_string(),
    source: Box::new(e),
  })?;

  repo
    .edit_reference(RefEdit {
      change: Change::Update {
        log: LogChange {
          mode: RefLog::AndReference,
          force_create_reflog: false,
          message: format!("checkout: moving to {}", rev).into(),
        },
        expected: PreviousValue::Any,
        new: gix::refs::Target::Object(id),
      },
      name,
      deref: false,
    })
    .map_err(|e| FetchError::Checkout {
      rev: rev.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  mod populated {
    use super::*;

    #[test]
    fn missing_dir_is_not_populated() {
      let temp = TempDir::new().unwrap();
      assert!(!is_populated(&temp.path().join("absent")).unwrap());
    }

    #[test]
    fn empty_dir_is_not_populated() {
      let temp = TempDir::new().unwrap();
      assert!(!is_populated(temp.path()).unwrap());
    }

    #[test]
    fn dir_with_entry_is_populated() {
      let temp = TempDir::new().unwrap();
      fs::write(temp.path().join("README"), "hi").unwrap();
      assert!(is_populated(temp.path()).unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn file_in_place_of_dir_is_an_error() {
      let temp = TempDir::new().unwrap();
      let file = temp.path().join("file");
      fs::write(&file, "x").unwrap();
      assert!(matches!(is_populated(&file), Err(FetchError::Inspect(..))));
    }
  }

  mod commit_hash {
    use super::*;

    #[test]
    fn recognizes_full_object_ids() {
      assert!(is_commit_hash("0123456789abcdef0123456789abcdef01234567"));
      assert!(is_commit_hash(&"a".repeat(64)));
    }

    #[test]
    fn branches_and_tags_are_not_hashes() {
      assert!(!is_commit_hash("main"));
      assert!(!is_commit_hash("v1.2.0"));
      assert!(!is_commit_hash("abc123"));
      assert!(!is_commit_hash(&"g".repeat(40)));
    }
  }

  /// Local origin repository served over `file://`.
  ///
  /// History: `v1` (tagged `v1.2.0`) then `v2` on `main`.
  #[cfg(unix)]
  mod clone {
    use super::*;
    use std::process::Command;

    struct Origin {
      temp: TempDir,
      url: String,
      first: String,
    }

    fn git(dir: &Path, args: &[&str]) -> String {
      let output = Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
      assert!(output.status.success(), "git {:?} failed: {}", args, String::from_utf8_lossy(&output.stderr));
      String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn commit_version(dir: &Path, version: &str) -> String {
      fs::write(dir.join("VERSION"), version).unwrap();
      git(dir, &["add", "."]);
      git(dir, &["commit", "-m", version]);
      git(dir, &["rev-parse", "HEAD"])
    }

    fn origin() -> Origin {
      let temp = TempDir::new().unwrap();
      let repo = temp.path().join("widget");
      fs::create_dir_all(&repo).unwrap();
      git(&repo, &["init"]);
      git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);

      let first = commit_version(&repo, "v1");
      git(&repo, &["tag", "v1.2.0"]);
      commit_version(&repo, "v2");

      Origin {
        url: format!("file://{}", repo.display()),
        temp,
        first,
      }
    }

    fn version(dest: &Path) -> String {
      fs::read_to_string(dest.join("VERSION")).unwrap()
    }

    #[test]
    fn tag_is_cloned_shallow() {
      let origin = origin();
      let dest = origin.temp.path().join("out").join("widget");

      GitFetcher::new().fetch(&origin.url, "v1.2.0", &dest).unwrap();

      assert_eq!(version(&dest), "v1");
      assert!(gix::open(&dest).unwrap().is_shallow());
    }

    #[test]
    fn branch_is_cloned_at_tip() {
      let origin = origin();
      let dest = origin.temp.path().join("out").join("widget");

      GitFetcher::new().fetch(&origin.url, "main", &dest).unwrap();

      assert_eq!(version(&dest), "v2");
    }

    #[test]
    fn commit_hash_is_checked_out_detached() {
      let origin = origin();
      let dest = origin.temp.path().join("out").join("widget");

      GitFetcher::new().fetch(&origin.url, &origin.first, &dest).unwrap();

      assert_eq!(version(&dest), "v1");
      let repo = gix::open(&dest).unwrap();
      assert_eq!(repo.head_id().unwrap().to_string(), origin.first);
    }

    #[test]
    fn unknown_commit_leaves_nothing_behind() {
      let origin = origin();
      let dest = origin.temp.path().join("out").join("widget");

      let err = GitFetcher::new().fetch(&origin.url, &"0".repeat(40), &dest).unwrap_err();

      assert!(matches!(err, FetchError::RevisionNotFound { .. }));
      assert!(!dest.exists());
    }

    #[test]
    fn unknown_ref_leaves_nothing_behind() {
      let origin = origin();
      let dest = origin.temp.path().join("out").join("widget");

      let err = GitFetcher::new().fetch(&origin.url, "nope", &dest).unwrap_err();

      assert!(matches!(err, FetchError::Clone { .. }));
      assert!(!dest.exists());
    }

    #[test]
    fn abbreviated_hash_is_requested_as_ref() {
      let origin = origin();
      let dest = origin.temp.path().join("out").join("widget");

      let result = GitFetcher::new().fetch(&origin.url, &origin.first[..7], &dest);

      assert!(matches!(result, Err(FetchError::Clone { .. })));
      assert!(!dest.exists());
    }
  }

  // NOTE: Fetching from real remotes requires network access and lives in the
  // CLI's ignored tests.
}
