//! Implementation of the `srcdep register` command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use srcdep_lib::resolve::{LocalRegistrar, Subprojects};

use crate::Settings;
use crate::output::{print_json, print_stat, print_success};

/// Register a local package, optionally as a subproject.
///
/// When `out_file` is given, the registered source directory is written to it
/// so calling build scripts can pick it up.
pub fn cmd_register(settings: &Settings, dir: &Path, include: bool, out_file: Option<&Path>) -> Result<()> {
  let registrar = LocalRegistrar::new(&settings.roots).with_descriptor(settings.descriptor.as_str());

  let mut subprojects = Subprojects::new();
  let result = if include {
    registrar.incorporate_local(dir, &mut subprojects)
  } else {
    registrar.register_local(dir)
  };
  let pkg = result.with_context(|| format!("Failed to register local package {}", dir.display()))?;

  if let Some(out_file) = out_file {
    debug!(path = %out_file.display(), "writing package directory");
    fs::write(out_file, pkg.source_dir.display().to_string())
      .with_context(|| format!("Failed to write {}", out_file.display()))?;
  }

  if settings.output.is_json() {
    let json = serde_json::json!({ "package": pkg, "subprojects": subprojects });
    print_json(&json)?;
  } else {
    print_success(&format!("Registered {}", pkg.source_dir.display()));
    print_stat("Build", &pkg.build_dir.display().to_string());
    print_stat("Install", &pkg.install_dir.display().to_string());
    if let Some(sub) = subprojects.iter().next() {
      print_stat("Subproject", &sub.name);
    }
  }

  Ok(())
}
