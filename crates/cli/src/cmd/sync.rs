//! Implementation of the `srcdep sync` command.
//!
//! Loads a manifest and resolves every entry in order. The first failing
//! entry aborts the command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use srcdep_lib::manifest::Manifest;
use srcdep_lib::resolve::{LocalRegistrar, RemoteResolver};
use srcdep_lib::sync::sync_manifest;

use crate::Settings;
use crate::output::{format_duration, print_info, print_json, print_stat, print_success, symbols};

pub fn cmd_sync(settings: &Settings, manifest: Option<&Path>) -> Result<()> {
  let start = Instant::now();

  let manifest = Manifest::load(manifest).context("Failed to load manifest")?;
  let remote = RemoteResolver::new(&settings.roots);
  let local = LocalRegistrar::new(&settings.roots).with_descriptor(settings.descriptor.as_str());

  let outcome = sync_manifest(&manifest, &remote, &local).context("Sync failed")?;

  if settings.output.is_json() {
    return print_json(&outcome);
  }

  if outcome.packages.is_empty() {
    print_info(&format!("No packages declared in {}", manifest.path.display()));
    return Ok(());
  }

  for pkg in &outcome.packages {
    let kind = if pkg.is_remote() { "remote" } else { "local" };
    println!(
      "  {} {} ({}) {} {}",
      symbols::INFO,
      pkg.identifier,
      kind,
      symbols::ARROW,
      pkg.source_dir.display()
    );
  }

  println!();
  print_success("Sync complete!");
  print_stat("Packages", &outcome.packages.len().to_string());
  print_stat("Subprojects", &outcome.subprojects.len().to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
