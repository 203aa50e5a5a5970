//! Implementation of the `srcdep gather` command.

use std::path::Path;

use anyhow::{Context, Result, bail};

use srcdep_lib::gather::{EntryOutcome, GatherOptions, gather_packages};
use srcdep_lib::manifest::Manifest;

use crate::Settings;
use crate::output::{print_json, print_stat, print_success, print_warning, symbols};

/// Gather package metadata into the manifest's cache folder.
///
/// Per-entry failures are reported but do not stop the pass. The command
/// fails when no package was copied.
pub fn cmd_gather(settings: &Settings, manifest: Option<&Path>, clean: bool, metadata_file: String) -> Result<()> {
  let manifest = Manifest::load(manifest).context("Failed to load manifest")?;

  let options = GatherOptions { clean, metadata_file };
  let report = gather_packages(&manifest, &settings.roots, options).context("Gather failed")?;

  if settings.output.is_json() {
    print_json(&report)?;
  } else {
    let total = report.entries.len();
    for entry in &report.entries {
      match &entry.outcome {
        EntryOutcome::Copied { name, dest } => println!(
          "  {} [{}/{}] {} {} {}",
          symbols::SUCCESS,
          entry.index,
          total,
          name,
          symbols::ARROW,
          dest.display()
        ),
        EntryOutcome::Skipped { reason } => println!(
          "  {} [{}/{}] {} ({})",
          symbols::SKIP,
          entry.index,
          total,
          entry.label,
          reason
        ),
        EntryOutcome::Failed { reason } => {
          print_warning(&format!("[{}/{}] {}: {}", entry.index, total, entry.label, reason))
        }
      }
    }

    println!();
    if report.copied() > 0 {
      print_success("Gather complete!");
    }
    print_stat("Copied", &report.copied().to_string());
    print_stat("Skipped", &report.skipped().to_string());
    print_stat("Errors", &report.errors().to_string());
    print_stat("Cache", &report.cache_dir.display().to_string());
  }

  if report.copied() == 0 {
    bail!("No package metadata was gathered");
  }

  Ok(())
}
