use anyhow::Result;

use crate::Settings;
use crate::output::{print_json, print_stat};

pub fn cmd_info(settings: &Settings) -> Result<()> {
  if settings.output.is_json() {
    let json = serde_json::json!({
      "roots": settings.roots,
      "descriptor": settings.descriptor,
    });
    return print_json(&json);
  }

  println!("Roots:");
  print_stat("Remote sources", &settings.roots.remote_sources.display().to_string());
  print_stat("Build", &settings.roots.build.display().to_string());
  print_stat("Install", &settings.roots.install.display().to_string());
  println!();
  print_stat("Build descriptor", &settings.descriptor);

  Ok(())
}
