//! Organization SCIM identities (REST, `startIndex`/`count` paginated).

use crate::auth::Bearer;
use crate::client::{GitHubClient, SCIM_JSON};
use crate::error::{DataSource, FetchError, FetchErrorKind};
use crate::pagination::{PageSource, PageWalker};
use drift_core::ScimIdentity;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

/// One page of `GET /scim/v2/organizations/{org}/Users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse {
    total_results: u64,
    #[serde(default)]
    start_index: Option<u64>,
    #[serde(default, rename = "Resources")]
    resources: Vec<ScimUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScimUser {
    id: String,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    emails: Vec<ScimEmail>,
    #[serde(default = "default_active")]
    active: bool,
}

#[derive(Debug, Deserialize)]
struct ScimEmail {
    value: String,
    #[serde(default)]
    primary: bool,
}

fn default_active() -> bool {
    true
}

impl ScimUser {
    /// Primary email, then the first email, then `userName` if it is an
    /// address.
    fn primary_email(&self) -> Option<String> {
        self.emails
            .iter()
            .find(|email| email.primary)
            .or_else(|| self.emails.first())
            .map(|email| email.value.clone())
            .or_else(|| self.user_name.clone().filter(|name| name.contains('@')))
    }

    fn to_identity(&self) -> ScimIdentity {
        ScimIdentity {
            id: self.id.clone(),
            external_id: self.external_id.clone(),
            user_name: self.user_name.clone(),
            primary_email: self.primary_email(),
            active: self.active,
        }
    }
}

/// Offset-paginated source of SCIM identities.
#[derive(Debug, Clone)]
pub struct ScimSource {
    url: Url,
    page_size: u32,
}

impl ScimSource {
    /// Creates the source for `organization` using `client`'s settings.
    pub fn new(client: &GitHubClient, organization: &str) -> Self {
        Self {
            url: client
                .api()
                .endpoint(["scim", "v2", "organizations", organization, "Users"]),
            page_size: client.page_size(),
        }
    }
}

impl PageSource for ScimSource {
    /// 1-based `startIndex`.
    type Cursor = u64;
    type Response = ScimListResponse;
    type Item = ScimIdentity;

    fn data_source(&self) -> DataSource {
        DataSource::ScimIdentities
    }

    fn first_cursor(&self) -> u64 {
        1
    }

    fn request(&self, client: &GitHubClient, cursor: &u64) -> reqwest::RequestBuilder {
        client
            .http()
            .get(self.url.clone())
            .header(ACCEPT, SCIM_JSON)
            .query(&[("startIndex", *cursor), ("count", u64::from(self.page_size))])
    }

    fn items(&self, response: &ScimListResponse) -> Result<Vec<ScimIdentity>, FetchErrorKind> {
        Ok(response.resources.iter().map(ScimUser::to_identity).collect())
    }

    fn next_cursor(
        &self,
        cursor: &u64,
        response: &ScimListResponse,
        received: usize,
    ) -> Result<Option<u64>, FetchErrorKind> {
        if received == 0 || received < self.page_size as usize {
            return Ok(None);
        }

        let start = response.start_index.unwrap_or(*cursor);
        let next = start + received as u64;
        if next > response.total_results {
            return Ok(None);
        }
        Ok(Some(next))
    }
}

/// Fetches every SCIM identity provisioned for `organization`.
///
/// # Errors
///
/// Returns a [`FetchError`] if any page fails after retries or a page body
/// cannot be parsed.
pub async fn fetch_all_scim_identities(
    client: &GitHubClient,
    token: &dyn Bearer,
    organization: &str,
) -> Result<Vec<ScimIdentity>, FetchError> {
    let source = ScimSource::new(client, organization);
    PageWalker::new(client, token).walk(&source).await
}
