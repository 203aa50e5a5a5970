//! Root directories shared by every resolver call.
//!
//! Three roots key every package by identifier:
//!
//! ```text
//! <remote-source-root>/<id>/   # materialized remote source
//! <build-root>/<id>/           # build output
//! <install-root>/<id>/         # install output
//! ```
//!
//! A [`Roots`] value is built once per process (usually from the environment)
//! and passed by reference into the resolvers. It is never mutated afterwards.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::consts::{BUILD_DESCRIPTOR_ENV, BUILD_ROOT_ENV, DEFAULT_BUILD_DESCRIPTOR, INSTALL_ROOT_ENV, REMOTE_SOURCE_ROOT_ENV};
use crate::package::Identifier;
use crate::platform::paths::{default_build_root, default_install_root, default_remote_source_root};

/// Errors raised while building [`Roots`].
#[derive(Debug, Error)]
pub enum RootsError {
  /// A root was given as an empty path.
  #[error("{which} root is an empty path")]
  Empty { which: &'static str },

  /// A relative root could not be made absolute.
  #[error("failed to make '{path}' absolute: {source}")]
  Absolute {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Absolute root directories for sources, build outputs and install outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roots {
  /// Where remote sources are materialized.
  pub remote_sources: PathBuf,
  /// Where build outputs are written.
  pub build: PathBuf,
  /// Where install outputs are written.
  pub install: PathBuf,
}

/// Roots supplied explicitly, e.g. from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct RootOverrides {
  pub remote_sources: Option<PathBuf>,
  pub build: Option<PathBuf>,
  pub install: Option<PathBuf>,
}

impl Roots {
  /// Create roots from explicit paths. Relative paths are made absolute
  /// against the current directory.
  pub fn new(
    remote_sources: impl Into<PathBuf>,
    build: impl Into<PathBuf>,
    install: impl Into<PathBuf>,
  ) -> Result<Self, RootsError> {
    Ok(Self {
      remote_sources: absolutize("remote source", remote_sources.into())?,
      build: absolutize("build", build.into())?,
      install: absolutize("install", install.into())?,
    })
  }

  /// Read the roots from the environment.
  ///
  /// Each variable falls back to its default location when it is unset or
  /// empty, so a missing variable never produces an empty path segment.
  pub fn from_env() -> Result<Self, RootsError> {
    Self::from_env_with(RootOverrides::default())
  }

  /// Like [`Roots::from_env`], but explicit overrides win. The environment
  /// and default locations are only consulted for roots left unset.
  pub fn from_env_with(overrides: RootOverrides) -> Result<Self, RootsError> {
    Self::new(
      overrides
        .remote_sources
        .or_else(|| env_path(REMOTE_SOURCE_ROOT_ENV))
        .unwrap_or_else(default_remote_source_root),
      overrides
        .build
        .or_else(|| env_path(BUILD_ROOT_ENV))
        .unwrap_or_else(default_build_root),
      overrides
        .install
        .or_else(|| env_path(INSTALL_ROOT_ENV))
        .unwrap_or_else(default_install_root),
    )
  }

  /// Directory a remote package's source is materialized into.
  pub fn source_dir(&self, id: &Identifier) -> PathBuf {
    self.remote_sources.join(id.as_str())
  }

  /// Build output directory for a package.
  pub fn build_dir(&self, name: &str) -> PathBuf {
    self.build.join(name)
  }

  /// Install output directory for a package.
  pub fn install_dir(&self, name: &str) -> PathBuf {
    self.install.join(name)
  }
}

/// Build descriptor file name, honoring `SRCDEP_BUILD_DESCRIPTOR`.
pub fn build_descriptor_from_env() -> String {
  std::env::var(BUILD_DESCRIPTOR_ENV)
    .ok()
    .filter(|name| !name.trim().is_empty())
    .unwrap_or_else(|| DEFAULT_BUILD_DESCRIPTOR.to_string())
}

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn absolutize(which: &'static str, path: PathBuf) -> Result<PathBuf, RootsError> {
  if path.as_os_str().is_empty() {
    return Err(RootsError::Empty { which });
  }
  make_absolute(&path)
}

/// Make `path` absolute without touching the filesystem.
pub(crate) fn make_absolute(path: &Path) -> Result<PathBuf, RootsError> {
  if path.is_absolute() {
    return Ok(path.to_path_buf());
  }
  std::path::absolute(path).map_err(|source| RootsError::Absolute {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use temp_env::with_vars;

  #[test]
  fn package_dirs_are_keyed_by_identifier() {
    let roots = Roots::new("/r/src", "/r/build", "/r/install").unwrap();
    let id = Identifier::new("widget").unwrap();

    assert_eq!(roots.source_dir(&id), PathBuf::from("/r/src/widget"));
    assert_eq!(roots.build_dir("widget"), PathBuf::from("/r/build/widget"));
    assert_eq!(roots.install_dir("widget"), PathBuf::from("/r/install/widget"));
  }

  #[test]
  fn relative_roots_become_absolute() {
    let roots = Roots::new("src", "build", "install").unwrap();
    assert!(roots.remote_sources.is_absolute());
    assert!(roots.remote_sources.ends_with("src"));
    assert!(roots.build.is_absolute());
    assert!(roots.install.is_absolute());
  }

  #[test]
  fn empty_root_is_rejected() {
    let err = Roots::new("", "/b", "/i").unwrap_err();
    assert!(matches!(err, RootsError::Empty { which: "remote source" }));
  }

  #[test]
  #[serial]
  fn env_vars_override_default_roots() {
    with_vars(
      [
        (REMOTE_SOURCE_ROOT_ENV, Some("/custom/src")),
        (BUILD_ROOT_ENV, Some("/custom/build")),
        (INSTALL_ROOT_ENV, Some("/custom/install")),
      ],
      || {
        let roots = Roots::from_env().unwrap();
        assert_eq!(roots.remote_sources, PathBuf::from("/custom/src"));
        assert_eq!(roots.build, PathBuf::from("/custom/build"));
        assert_eq!(roots.install, PathBuf::from("/custom/install"));
      },
    )
  }

  #[test]
  #[serial]
  #[cfg(not(windows))]
  fn empty_env_var_falls_back_to_default() {
    with_vars(
      [
        (REMOTE_SOURCE_ROOT_ENV, Some("")),
        (BUILD_ROOT_ENV, None),
        (INSTALL_ROOT_ENV, None),
        ("XDG_CACHE_HOME", Some("/xdg/cache")),
        ("XDG_DATA_HOME", Some("/xdg/data")),
      ],
      || {
        let roots = Roots::from_env().unwrap();
        assert_eq!(roots.remote_sources, PathBuf::from("/xdg/cache/srcdep/sources"));
        assert_eq!(roots.build, PathBuf::from("/xdg/data/srcdep/build"));
        assert_eq!(roots.install, PathBuf::from("/xdg/data/srcdep/install"));
      },
    )
  }

  #[test]
  #[serial]
  fn overrides_win_over_env() {
    with_vars([(BUILD_ROOT_ENV, Some("/env/build"))], || {
      let roots = Roots::from_env_with(RootOverrides {
        build: Some(PathBuf::from("/flag/build")),
        ..Default::default()
      })
      .unwrap();
      assert_eq!(roots.build, PathBuf::from("/flag/build"));
    });
  }

  #[test]
  #[serial]
  #[cfg(not(windows))]
  fn full_overrides_never_consult_home() {
    with_vars(
      [
        ("HOME", None::<&str>),
        ("XDG_CACHE_HOME", None),
        ("XDG_DATA_HOME", None),
      ],
      || {
        let roots = Roots::from_env_with(RootOverrides {
          remote_sources: Some(PathBuf::from("/a")),
          build: Some(PathBuf::from("/b")),
          install: Some(PathBuf::from("/c")),
        })
        .unwrap();
        assert_eq!(roots.remote_sources, PathBuf::from("/a"));
        assert_eq!(roots.install, PathBuf::from("/c"));
      },
    );
  }

  #[test]
  #[serial]
  fn descriptor_env_override() {
    with_vars([(BUILD_DESCRIPTOR_ENV, Some("meson.build"))], || {
      assert_eq!(build_descriptor_from_env(), "meson.build");
    });
    with_vars([(BUILD_DESCRIPTOR_ENV, None::<&str>)], || {
      assert_eq!(build_descriptor_from_env(), DEFAULT_BUILD_DESCRIPTOR);
    });
  }
}
