//! Organization members with their verified domain emails (GraphQL).

use crate::auth::Bearer;
use crate::client::{GitHubClient, GITHUB_JSON};
use crate::error::{DataSource, FetchError, FetchErrorKind};
use crate::pagination::{PageSource, PageWalker};
use drift_core::OrgMember;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

const MEMBERS_QUERY: &str = r#"
query ($org: String!, $first: Int!, $cursor: String) {
  organization(login: $org) {
    membersWithRole(first: $first, after: $cursor) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        id
        login
        organizationVerifiedDomainEmails(login: $org)
      }
    }
  }
}
"#;

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

/// Error type GitHub reports when the GraphQL rate limit is exhausted.
const RATE_LIMITED: &str = "RATE_LIMITED";

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

/// `data` of the member query.
#[derive(Debug, Deserialize)]
pub struct MembersData {
    organization: Option<OrganizationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationNode {
    members_with_role: MemberConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<MemberNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberNode {
    id: String,
    login: String,
    #[serde(default)]
    organization_verified_domain_emails: Vec<String>,
}

/// Cursor-paginated source of organization members.
#[derive(Debug, Clone)]
pub struct MemberSource<'a> {
    organization: &'a str,
    page_size: u32,
    graphql_url: Url,
}

impl<'a> MemberSource<'a> {
    /// Creates the source for `organization` using `client`'s settings.
    pub fn new(client: &GitHubClient, organization: &'a str) -> Self {
        Self {
            organization,
            page_size: client.page_size(),
            graphql_url: client.api().graphql_url(),
        }
    }

    fn connection<'r>(
        &self,
        response: &'r GraphQlResponse<MembersData>,
    ) -> Result<&'r MemberConnection, FetchErrorKind> {
        if !response.errors.is_empty() {
            return Err(FetchErrorKind::GraphQl(
                response.errors.iter().map(|e| e.message.clone()).collect(),
            ));
        }

        response
            .data
            .as_ref()
            .and_then(|data| data.organization.as_ref())
            .map(|organization| &organization.members_with_role)
            .ok_or_else(|| {
                FetchErrorKind::InvalidResponse(format!(
                    "organization {} not found or not visible to this token",
                    self.organization
                ))
            })
    }
}

impl PageSource for MemberSource<'_> {
    type Cursor = Option<String>;
    type Response = GraphQlResponse<MembersData>;
    type Item = OrgMember;

    fn data_source(&self) -> DataSource {
        DataSource::Members
    }

    fn first_cursor(&self) -> Self::Cursor {
        None
    }

    fn request(&self, client: &GitHubClient, cursor: &Self::Cursor) -> reqwest::RequestBuilder {
        let body = serde_json::json!({
            "query": MEMBERS_QUERY,
            "variables": {
                "org": self.organization,
                "first": self.page_size,
                "cursor": cursor,
            },
        });

        client
            .http()
            .post(self.graphql_url.clone())
            .header(ACCEPT, GITHUB_JSON)
            .json(&body)
    }

    fn is_rate_limited(&self, response: &Self::Response) -> bool {
        response
            .errors
            .iter()
            .any(|error| error.error_type.as_deref() == Some(RATE_LIMITED))
    }

    fn items(&self, response: &Self::Response) -> Result<Vec<OrgMember>, FetchErrorKind> {
        let connection = self.connection(response)?;
        Ok(connection
            .nodes
            .iter()
            .flatten()
            .map(|node| {
                OrgMember::new(
                    node.login.clone(),
                    node.id.clone(),
                    node.organization_verified_domain_emails.iter().cloned(),
                )
            })
            .collect())
    }

    fn next_cursor(
        &self,
        _cursor: &Self::Cursor,
        response: &Self::Response,
        _received: usize,
    ) -> Result<Option<Self::Cursor>, FetchErrorKind> {
        let page_info = &self.connection(response)?.page_info;
        if !page_info.has_next_page {
            return Ok(None);
        }

        match &page_info.end_cursor {
            Some(end_cursor) => Ok(Some(Some(end_cursor.clone()))),
            None => Err(FetchErrorKind::InvalidResponse(
                "hasNextPage is true but endCursor is missing".to_string(),
            )),
        }
    }
}

/// Fetches every member of `organization` with their verified domain emails.
///
/// # Errors
///
/// Returns a [`FetchError`] if any page fails after retries, if GraphQL
/// reports errors, or if the organization is not visible.
pub async fn fetch_all_members(
    client: &GitHubClient,
    token: &dyn Bearer,
    organization: &str,
) -> Result<Vec<OrgMember>, FetchError> {
    let source = MemberSource::new(client, organization);
    PageWalker::new(client, token).walk(&source).await
}
