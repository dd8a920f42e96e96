//! scim-drift CLI library.
//!
//! Argument parsing, report rendering, workflow step summaries and exit code
//! mapping for the `scim-drift` binary.

pub mod args;
pub mod env;
pub mod exit_codes;
pub mod output;
pub mod run;
pub mod summary;
