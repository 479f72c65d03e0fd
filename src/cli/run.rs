//! # Run Command
//!
//! This module implements the header normalization run. This is the default
//! command when no subcommand is specified.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use crate::config::load_config;
use crate::diff::DiffManager;
use crate::handlers::HandlerRegistry;
use crate::info_log;
use crate::licenses::LicenseCatalog;
use crate::logging::{ColorMode, init_tracing, set_quiet, set_verbose};
use crate::output::{print_report, print_start_message};
use crate::probe::ProbeKind;
use crate::processor::{Action, Processor, ProcessorConfig};
use crate::report::JsonReport;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
  /// Directory (or single file) to process recursively
  #[arg(required = false, value_name = "TARGET")]
  pub target: Option<PathBuf>,

  /// Name prefix of the license to apply, e.g. "bsl" or "apache2"
  #[arg(long, env = "TARGET_LICENSE", value_name = "PREFIX")]
  pub target_license: Option<String>,

  /// Which changes are allowed
  #[arg(long, value_enum, default_value_t = Action::All)]
  pub action: Action,

  /// Disabled handlers to enable for this run (comma separated)
  #[arg(long, value_delimiter = ',', value_name = "NAMES")]
  pub optional_handlers: Vec<String>,

  /// Directory of handler definitions (*.toml) replacing the builtin ones
  #[arg(long, value_name = "DIR")]
  pub handlers_dir: Option<PathBuf>,

  /// Directory of license bodies (*.txt) replacing the builtin ones
  #[arg(long, value_name = "DIR")]
  pub licenses_dir: Option<PathBuf>,

  /// Path to config file (default: .license-injector.toml in the target)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Ignore config file even if present
  #[arg(long)]
  pub no_config: bool,

  /// File patterns to skip (glob, relative to the target; repeatable)
  #[arg(long, value_name = "GLOB")]
  pub exclude: Vec<String>,

  /// How to tell text files from binary ones
  #[arg(long, value_enum, default_value_t = ProbeKind::Sniff)]
  pub probe: ProbeKind,

  /// Number of files processed concurrently (overrides the config file)
  #[arg(long, value_name = "N")]
  pub queue_depth: Option<usize>,

  /// Compute every outcome without writing any file
  #[arg(long)]
  pub dry_run: bool,

  /// Print a unified diff of every change
  #[arg(long)]
  pub show_diff: bool,

  /// List at most N files per outcome in the report (default: all)
  #[arg(long, value_name = "N")]
  pub list_limit: Option<usize>,

  /// Save a JSON report of the run to the specified path
  #[arg(long, value_name = "OUTPUT")]
  pub report_json: Option<PathBuf>,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// Control when to use colored output (auto, never, always)
  #[arg(
    long,
    value_name = "WHEN",
    num_args = 0..=1,
    default_value_t = ColorMode::Auto,
    default_missing_value = "always",
    value_enum
  )]
  pub colors: ColorMode,
}

impl RunArgs {
  /// Validate the arguments and return an error if invalid
  fn validate(&self) -> Result<(PathBuf, String)> {
    let target = self
      .target
      .clone()
      .ok_or_else(|| anyhow::anyhow!("Missing required argument: <TARGET>"))?;
    let target_license = self
      .target_license
      .clone()
      .filter(|prefix| !prefix.is_empty())
      .ok_or_else(|| anyhow::anyhow!("Missing required argument: --target-license <PREFIX> (or TARGET_LICENSE)"))?;
    Ok((target, target_license))
  }
}

/// Run the header normalization with the given arguments
pub async fn run(args: RunArgs) -> Result<()> {
  let (target, target_license) = args.validate()?;

  // Initialize tracing subscriber for structured logging
  init_tracing(args.quiet, args.verbose);

  // Set verbose mode for output formatting and info_log! macro
  if args.verbose > 0 {
    set_verbose();
  } else if args.quiet {
    set_quiet();
  }
  args.colors.apply();

  debug!(
    "license-injector {} ({} {})",
    env!("CARGO_PKG_VERSION"),
    option_env!("GIT_HASH").unwrap_or("unknown"),
    option_env!("GIT_DATE").unwrap_or("unknown")
  );

  let target = std::fs::canonicalize(&target).with_context(|| format!("Target not found: {}", target.display()))?;
  let config_root = if target.is_dir() {
    target.clone()
  } else {
    target.parent().map_or_else(|| target.clone(), std::path::Path::to_path_buf)
  };

  let mut config = load_config(args.config.as_deref(), &config_root, args.no_config)?;
  if let Some(queue_depth) = args.queue_depth {
    config.queue_depth = queue_depth;
  }
  let rules = config.compile()?;

  let registry = match &args.handlers_dir {
    Some(dir) => HandlerRegistry::load_dir(dir, &args.optional_handlers)?,
    None => HandlerRegistry::builtin(&args.optional_handlers)?,
  };
  let catalog = match &args.licenses_dir {
    Some(dir) => LicenseCatalog::load_dir(dir)?,
    None => LicenseCatalog::builtin(),
  };

  let processor = Processor::new(ProcessorConfig {
    action: args.action,
    dry_run: args.dry_run,
    probe: args.probe.build(),
    exclude_globs: args.exclude,
    diff_manager: args.show_diff.then(|| DiffManager::new(true)),
    ..ProcessorConfig::new(rules, registry, catalog, target_license)
  })?;

  print_start_message(&target, args.dry_run);

  let start_time = Instant::now();
  let results = processor.run(&target).await?;
  let elapsed = start_time.elapsed();
  debug!("Run finished in {}ms", elapsed.as_millis());

  print_report(&results, &config_root, args.list_limit);

  if let Some(ref output_path) = args.report_json {
    if let Err(e) = JsonReport::new(&results, &config_root, elapsed).write(output_path) {
      eprintln!("Error generating JSON report: {:#}", e);
    } else {
      info_log!("Generated JSON report at {}", output_path.display());
    }
  }

  Ok(())
}
