//! Implementation of the `srcdep fetch` command.

use std::time::Instant;

use anyhow::{Context, Result};

use srcdep_lib::package::PackageDecl;
use srcdep_lib::resolve::RemoteResolver;

use crate::Settings;
use crate::output::{format_duration, print_json, print_stat, print_success};

/// Resolve a remote package, fetching it when its source directory is empty.
pub fn cmd_fetch(settings: &Settings, repository: &str, revision: &str, name: Option<&str>) -> Result<()> {
  let start = Instant::now();

  let mut decl = PackageDecl::new(repository, revision);
  if let Some(name) = name {
    decl = decl.with_name(name);
  }

  let resolver = RemoteResolver::new(&settings.roots);
  let pkg = resolver
    .resolve_decl(&decl)
    .with_context(|| format!("Failed to fetch {}@{}", repository, revision))?;

  if settings.output.is_json() {
    print_json(&pkg)?;
  } else {
    print_success(&format!("Package '{}' ready", pkg.identifier));
    print_stat("Source", &pkg.source_dir.display().to_string());
    print_stat("Build", &pkg.build_dir.display().to_string());
    print_stat("Install", &pkg.install_dir.display().to_string());
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
