//! Command line arguments.

use crate::env::{
    ENV_API_URL, ENV_APP_ID, ENV_FAIL_ON_DRIFT, ENV_INSTALL_ID, ENV_ORG, ENV_PAT_TOKEN,
    ENV_PEM_KEY, ENV_PEM_KEY_PATH, ENV_STEP_SUMMARY,
};
use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use drift_github::Settings;
use std::path::PathBuf;

/// Report format written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Styled tables
    Table,
    /// Plain lists, one login per line
    Txt,
    /// The full report as JSON
    Json,
}

/// scim-drift
#[derive(Debug, Parser)]
#[command(name = "scim-drift")]
#[command(about = "Find organization members that have no SCIM-provisioned identity", long_about = None)]
#[command(version)]
pub struct Args {
    /// Organization login
    #[arg(long, env = ENV_ORG)]
    pub org: Option<String>,

    /// GitHub App ID
    #[arg(long, env = ENV_APP_ID)]
    pub app_id: Option<String>,

    /// Installation ID of the app on the organization
    #[arg(long = "install-id", env = ENV_INSTALL_ID)]
    pub installation_id: Option<String>,

    /// Base64-encoded PEM private key of the app
    #[arg(long, env = ENV_PEM_KEY, hide_env_values = true)]
    pub pem_key: Option<String>,

    /// Path to the PEM private key of the app
    #[arg(long, env = ENV_PEM_KEY_PATH)]
    pub pem_key_path: Option<PathBuf>,

    /// Personal access token for the member query
    #[arg(long, env = ENV_PAT_TOKEN, hide_env_values = true)]
    pub pat_token: Option<String>,

    /// API base URL (GitHub Enterprise Server)
    #[arg(long, env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "table")]
    pub out_format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Exit with code 20 when drift is found
    #[arg(long, env = ENV_FAIL_ON_DRIFT, value_parser = BoolishValueParser::new())]
    pub fail_on_drift: bool,

    /// Append a Markdown summary to this file
    #[arg(long, env = ENV_STEP_SUMMARY)]
    pub summary_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Raw engine settings from the parsed arguments.
    pub fn settings(&self) -> Settings {
        Settings {
            organization: self.org.clone(),
            app_id: self.app_id.clone(),
            installation_id: self.installation_id.clone(),
            pem_key: self.pem_key.clone(),
            pem_key_path: self.pem_key_path.clone(),
            pat_token: self.pat_token.clone(),
            api_url: self.api_url.clone(),
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self, runner_debug: bool) -> &'static str {
        match (self.verbose, runner_debug) {
            (0, false) => "info",
            (0, true) | (1, _) => "debug",
            _ => "trace",
        }
    }

    /// Whether output may use ANSI colors.
    pub fn colors_enabled(&self) -> bool {
        !self.no_color && !crate::env::colors_disabled()
    }
}
