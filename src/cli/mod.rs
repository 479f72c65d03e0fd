//! # CLI Module
//!
//! This module contains the command-line interface implementation.
//! It uses clap for argument parsing; `run` is both the only subcommand and
//! the default when none is given.

mod run;

use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Parser, Subcommand};
pub use run::{RunArgs, run};

const CUSTOM_STYLES: Styles = Styles::styled()
  .header(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .usage(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))).bold())
  .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))).bold())
  .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
  .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))).bold())
  .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
  .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))));

/// Top-level CLI arguments
#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about,
  styles = CUSTOM_STYLES,
  args_conflicts_with_subcommands = true,
  after_help = "Examples:
  # Rewrite legacy headers and inject missing ones
  license-injector --target-license bsl ~/src/couchbase

  # Only rewrite existing headers, showing what would change
  license-injector --target-license bsl --action modify --dry-run --show-diff src/

  # Include the Markdown handler and skip vendored code
  license-injector --target-license apache2 --optional-handlers markdown --exclude \"vendor/**\" .

  # Use the file(1) command to tell text from binary, and save a JSON report
  license-injector --target-license bsl --probe file --report-json report.json .
",
  help_template = "{before-help}{name} v{version}
{about-section}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Option<Command>,

  #[command(flatten)]
  pub run_args: RunArgs,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
  /// Normalize license headers under a directory (default)
  Run(RunArgs),
}

impl Cli {
  /// Parse CLI arguments and return the Cli struct
  pub fn parse_args() -> Self {
    Self::parse()
  }

  /// Get the effective run arguments, whether from a subcommand or top-level
  pub fn into_run_args(self) -> RunArgs {
    match self.command {
      Some(Command::Run(args)) => args,
      None => self.run_args,
    }
  }
}
