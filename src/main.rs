//! # license-injector
//!
//! Normalizes copyright/license headers across a source tree.

use anyhow::Result;
use license_injector::cli::{Cli, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  let cli = Cli::parse_args();
  run(cli.into_run_args()).await
}
