//! Exit code handling for the scim-drift CLI.
//!
//! This module provides consistent exit codes for the ways a run can end and
//! utilities for process termination.

use anyhow::Error;
use drift_core::DriftReport;
use drift_github::{ConfigError, DriftError, FetchErrorKind};
use std::process;

/// Standard exit codes used by the scim-drift CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    GeneralError = 1,
    /// Invalid arguments or configuration
    InvalidArgs = 2,
    /// Authentication error
    AuthError = 3,
    /// Network or API error while fetching
    NetworkError = 6,
    /// Drift found and `--fail-on-drift` set
    DriftDetected = 20,
}

impl ExitCode {
    /// Get the exit code as an i32.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get a human-readable description of the exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::InvalidArgs => "Invalid arguments or configuration",
            ExitCode::AuthError => "Authentication error",
            ExitCode::NetworkError => "Network or API error",
            ExitCode::DriftDetected => "Drift detected",
        }
    }

    /// Exit code for a failed run.
    pub fn from_drift_error(error: &DriftError) -> Self {
        match error {
            DriftError::Config(_) => ExitCode::InvalidArgs,
            DriftError::Auth(_) => ExitCode::AuthError,
            DriftError::Fetch(fetch) => match fetch.kind {
                FetchErrorKind::TokenExpired(_) => ExitCode::AuthError,
                _ => ExitCode::NetworkError,
            },
        }
    }

    /// Convert from an anyhow::Error to an ExitCode with best-effort categorization.
    pub fn from_anyhow_error(error: &Error) -> Self {
        if let Some(drift_error) = error.downcast_ref::<DriftError>() {
            return Self::from_drift_error(drift_error);
        }
        if error.downcast_ref::<ConfigError>().is_some() {
            return ExitCode::InvalidArgs;
        }
        ExitCode::GeneralError
    }

    /// Exit code for a completed run.
    ///
    /// Drift is informational unless `fail_on_drift` is set.
    pub fn for_report(report: &DriftReport, fail_on_drift: bool) -> Self {
        if fail_on_drift && report.has_drift() {
            ExitCode::DriftDetected
        } else {
            ExitCode::Success
        }
    }
}

/// Exit handler that manages process termination with appropriate codes.
pub struct ExitHandler {
    /// Whether to print exit codes in verbose mode
    verbose: bool,
}

impl ExitHandler {
    /// Create a new exit handler.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Exit with a specific exit code.
    pub fn exit_with_code(&self, code: ExitCode) -> ! {
        if self.verbose {
            eprintln!(
                "Exiting with code {} ({})",
                code.as_i32(),
                code.description()
            );
        }
        process::exit(code.as_i32());
    }

    /// Exit with an anyhow error, printing its chain first.
    pub fn exit_with_anyhow_error(&self, error: &Error) -> ! {
        let code = ExitCode::from_anyhow_error(error);
        let mark = console::style("✗").red();
        eprintln!("{} {:#}", mark, error);
        self.exit_with_code(code);
    }

    /// Handle a Result, exiting with the matching code either way.
    pub fn handle_result(&self, result: Result<ExitCode, Error>) -> ! {
        match result {
            Ok(code) => self.exit_with_code(code),
            Err(error) => self.exit_with_anyhow_error(&error),
        }
    }
}
