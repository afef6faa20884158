// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module.
//!
//! Argument parsing, terminal output helpers and the `serve`, `detect` and
//! `check` commands.

/// CLI arguments.
pub mod args;

/// Terminal output and tracing setup.
pub mod logging;

/// System check.
pub mod check;

/// Single image detection.
pub mod detect;

/// Web server startup.
pub mod serve;
