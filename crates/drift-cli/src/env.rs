//! Environment variable handling for CI runs.
//!
//! Every input can come from the environment so the tool runs unattended in a
//! GitHub Actions workflow.

use std::env;

/// Environment variable names
pub const ENV_ORG: &str = "GH_ORG";
pub const ENV_APP_ID: &str = "GH_APP_ID";
pub const ENV_INSTALL_ID: &str = "GH_INSTALL_ID";
pub const ENV_PEM_KEY: &str = "GH_PEM_KEY";
pub const ENV_PEM_KEY_PATH: &str = "GH_PEM_KEY_PATH";
pub const ENV_PAT_TOKEN: &str = "GH_PAT_TOKEN";
pub const ENV_API_URL: &str = "GH_API_URL";
pub const ENV_FAIL_ON_DRIFT: &str = "FAIL_ON_DRIFT";
pub const ENV_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";
pub const ENV_RUNNER_DEBUG: &str = "RUNNER_DEBUG";
pub const ENV_NO_COLOR: &str = "NO_COLOR";

/// Checks if the workflow runs with debug logging enabled
///
/// # Returns
///
/// true if RUNNER_DEBUG is set to "1"
pub fn is_runner_debug() -> bool {
    env::var(ENV_RUNNER_DEBUG)
        .map(|v| v.trim() == "1")
        .unwrap_or(false)
}

/// Checks if colors are disabled through the environment
///
/// Follows the NO_COLOR convention (any non-empty value) and treats
/// `TERM=dumb` the same way.
pub fn colors_disabled() -> bool {
    env::var(ENV_NO_COLOR).is_ok_and(|v| !v.is_empty())
        || env::var("TERM").is_ok_and(|term| term == "dumb")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_runner_debug() {
        env::remove_var(ENV_RUNNER_DEBUG);
        assert!(!is_runner_debug());

        env::set_var(ENV_RUNNER_DEBUG, "1");
        assert!(is_runner_debug());

        env::set_var(ENV_RUNNER_DEBUG, "0");
        assert!(!is_runner_debug());

        env::remove_var(ENV_RUNNER_DEBUG);
    }
}
