mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use srcdep_lib::consts::PACKAGE_METADATA_FILENAME;
use srcdep_lib::roots::{RootOverrides, Roots, build_descriptor_from_env};

use crate::output::{OutputFormat, print_error};

/// srcdep - resolve and materialize package sources for builds
#[derive(Parser)]
#[command(name = "srcdep")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  /// Root directory remote sources are materialized into
  #[arg(long, global = true, value_name = "DIR")]
  remote_root: Option<PathBuf>,

  /// Root directory for build outputs
  #[arg(long, global = true, value_name = "DIR")]
  build_root: Option<PathBuf>,

  /// Root directory for install outputs
  #[arg(long, global = true, value_name = "DIR")]
  install_root: Option<PathBuf>,

  /// File a local package must contain to be buildable
  #[arg(long, global = true, value_name = "FILE")]
  descriptor: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch a remote package at a revision
  Fetch {
    /// Git repository URL
    #[arg(long)]
    git_repository: String,

    /// Branch, tag or commit to fetch
    #[arg(long)]
    git_tag: String,

    /// Package identifier (derived from the URL when omitted)
    #[arg(long)]
    name: Option<String>,
  },

  /// Register a local package directory
  Register {
    /// Directory containing the package's build descriptor
    #[arg(long, alias = "local-package-path", value_name = "DIR")]
    source_dir: PathBuf,

    /// Incorporate the package as a subproject
    #[arg(long)]
    include: bool,

    /// Write the registered source directory to this file
    #[arg(long, value_name = "FILE")]
    out_package_dir: Option<PathBuf>,
  },

  /// Resolve every package in a manifest
  Sync {
    /// Manifest file (default: packages.manifest.yaml)
    #[arg(short, long)]
    manifest: Option<PathBuf>,
  },

  /// Collect package metadata into the manifest's cache folder
  Gather {
    /// Manifest file (default: packages.manifest.yaml)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Remove the cache folder before gathering
    #[arg(long)]
    clean: bool,

    /// Metadata file looked up in each package
    #[arg(long, value_name = "FILE", default_value = PACKAGE_METADATA_FILENAME)]
    metadata_file: String,
  },

  /// Show the effective root directories
  Info,
}

/// Resolver settings shared by every command.
pub struct Settings {
  pub roots: Roots,
  pub descriptor: String,
  pub output: OutputFormat,
}

impl Settings {
  fn from_cli(cli: &Cli) -> Result<Self> {
    let roots = Roots::from_env_with(RootOverrides {
      remote_sources: cli.remote_root.clone(),
      build: cli.build_root.clone(),
      install: cli.install_root.clone(),
    })
    .context("Invalid root directory")?;

    let descriptor = cli.descriptor.clone().unwrap_or_else(build_descriptor_from_env);
    let output = if cli.json { OutputFormat::Json } else { OutputFormat::Text };

    Ok(Self {
      roots,
      descriptor,
      output,
    })
  }
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let settings = Settings::from_cli(&cli)?;

  match cli.command {
    Commands::Fetch {
      git_repository,
      git_tag,
      name,
    } => cmd::cmd_fetch(&settings, &git_repository, &git_tag, name.as_deref()),
    Commands::Register {
      source_dir,
      include,
      out_package_dir,
    } => cmd::cmd_register(&settings, &source_dir, include, out_package_dir.as_deref()),
    Commands::Sync { manifest } => cmd::cmd_sync(&settings, manifest.as_deref()),
    Commands::Gather {
      manifest,
      clean,
      metadata_file,
    } => cmd::cmd_gather(&settings, manifest.as_deref(), clean, metadata_file),
    Commands::Info => cmd::cmd_info(&settings),
  }
}
