//! The single-pass drift run.
//!
//! authenticate → {fetch members ∥ fetch SCIM identities} → compare.
//!
//! Both fetches are polled concurrently on the current task. The first
//! terminal error drops the other in-flight fetch, so no partial report is
//! ever produced.

use crate::auth::{AppAuthenticator, Bearer};
use crate::client::GitHubClient;
use crate::config::EngineConfig;
use crate::error::{ConfigError, DriftError};
use crate::members::fetch_all_members;
use crate::scim::fetch_all_scim_identities;
use drift_core::{reconcile, DriftReport};
use tracing::info;

/// Runs the drift comparison for one organization.
#[derive(Debug)]
pub struct DriftEngine {
    config: EngineConfig,
    client: GitHubClient,
}

impl DriftEngine {
    /// Creates an engine from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let client = GitHubClient::new(config.api.clone())?;
        Ok(Self { config, client })
    }

    /// Organization being checked.
    pub fn organization(&self) -> &str {
        &self.config.organization
    }

    /// Authenticates, fetches both data sets and compares them.
    ///
    /// # Errors
    ///
    /// Returns the first authentication or fetch failure. Authentication
    /// failures happen before any fetch starts.
    pub async fn run(&self) -> Result<DriftReport, DriftError> {
        let organization = self.organization();

        info!("authenticating as GitHub App {}", self.config.credentials.app_id);
        let installation_token = AppAuthenticator::new(&self.client)
            .authenticate(&self.config.credentials)
            .await?;

        let member_token: &dyn Bearer = match &self.config.member_token {
            Some(token) => {
                info!("using personal access token for the member query");
                token
            }
            None => &installation_token,
        };

        info!("fetching members and SCIM identities of {}", organization);
        let (members, identities) = tokio::try_join!(
            fetch_all_members(&self.client, member_token, organization),
            fetch_all_scim_identities(&self.client, &installation_token, organization),
        )?;

        let report = reconcile(&members, &identities).for_organization(organization);
        info!(
            "compared {} members with {} SCIM identities: {} without SCIM, {} without verified email",
            report.total_members(),
            report.total_scim_identities(),
            report.members_without_scim().len(),
            report.members_without_verified_email().len()
        );

        Ok(report)
    }
}
