//! # Logging Module
//!
//! Output plumbing for the license injector:
//! - structured diagnostics through `tracing` (see [`init_tracing`])
//! - the [`verbose_log!`] and [`info_log!`] macros for user-facing progress
//!   lines, which honor `--verbose` and `--quiet`
//! - [`ColorMode`] for the `--colors` flag
//!
//! ## Example
//!
//! ```rust
//! use license_injector::logging::{ColorMode, set_verbose};
//! use license_injector::{info_log, verbose_log};
//!
//! set_verbose();
//! ColorMode::Never.apply();
//!
//! verbose_log!("Scanning: {}", "src/main.c");
//! info_log!("Injected header into: {}", "src/main.c");
//! ```

mod modes;

pub use modes::{ColorMode, init_tracing, is_quiet, is_verbose, set_quiet, set_verbose};
use owo_colors::{OwoColorize, Stream};

/// Logs a message to stderr if verbose mode is enabled.
#[macro_export]
macro_rules! verbose_log {
    ($($arg:tt)*) => {
        if $crate::logging::is_verbose() {
            eprintln!($($arg)*);
        }
    };
}

/// Logs a message to stdout unless quiet mode is enabled.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        if !$crate::logging::is_quiet() {
            $crate::logging::print_info_log(&format!($($arg)*));
        }
    };
}

/// Prints an [`info_log!`] line, yellow when colors are enabled.
pub fn print_info_log(message: &str) {
  println!("{}", message.if_supports_color(Stream::Stdout, |m| m.yellow()));
}
