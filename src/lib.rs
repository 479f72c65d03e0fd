//! # license-injector
//!
//! A tool that scans a source tree and normalizes copyright/license headers.
//!
//! Legacy headers are located by marker patterns and an aligned license body,
//! then rewritten in place to a canonical copyright line and the target
//! license, keeping each file's own comment decoration. Files without a header
//! get a new one in the comment style of their handler. Every file ends up in
//! exactly one outcome bucket of the run report.
//!
//! ## Features
//!
//! * Comment-style handlers matched by file name, extension and shebang
//! * License bodies re-flowed to the widest variant that fits the line width
//! * Several legacy headers in one file rewritten in a single pass
//! * Per-repository `.copyrightignore` lists, with oversize files appended
//! * Dry runs with unified diffs, and an optional JSON report
//!
//! ## Usage as a Library
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use license_injector::config::Config;
//! use license_injector::handlers::HandlerRegistry;
//! use license_injector::licenses::LicenseCatalog;
//! use license_injector::processor::{Processor, ProcessorConfig};
//! use license_injector::report::Outcome;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rules = Config::default().compile()?;
//!     let registry = HandlerRegistry::builtin(&[])?;
//!     let processor = Processor::new(ProcessorConfig {
//!         dry_run: true,
//!         ..ProcessorConfig::new(rules, registry, LicenseCatalog::builtin(), "bsl")
//!     })?;
//!
//!     let results = processor.run(Path::new("src")).await?;
//!     println!("{} headers would be injected", results.count(Outcome::Injected));
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! * [`processor`] - The file pipeline
//! * [`matcher`] - Locating legacy headers
//! * [`rewriter`] - Rendering canonical headers
//! * [`handlers`] - Comment styles
//! * [`licenses`] - License bodies
//!
//! [`processor`]: crate::processor
//! [`matcher`]: crate::matcher
//! [`rewriter`]: crate::rewriter
//! [`handlers`]: crate::handlers
//! [`licenses`]: crate::licenses

pub mod cli;
pub mod config;
pub mod diff;
pub mod file_filter;
pub mod git;
pub mod handlers;
pub mod ignore;
pub mod licenses;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod patterns;
pub mod probe;
pub mod processor;
pub mod report;
pub mod rewriter;
pub mod source_file;
