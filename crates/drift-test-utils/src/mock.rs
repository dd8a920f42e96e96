//! A mock GitHub API on top of `wiremock`.
//!
//! Paginated endpoints are mounted one mock per page, each expecting exactly
//! one request, so a walker that skips, repeats or over-reads a page fails
//! verification when the server is dropped.

use crate::fixtures::{
    members_page, scim_page, token_response, FAR_FUTURE, TEST_INSTALLATION_ID,
    TEST_INSTALLATION_TOKEN, TEST_ORG,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate, Times};

/// Cursor the mock hands out after page `index`.
pub fn page_cursor(index: usize) -> String {
    format!("Y3Vyc29yOnYyOpK{}", index)
}

/// A GitHub API stand-in.
pub struct MockGitHub {
    server: MockServer,
}

impl MockGitHub {
    /// Starts an empty mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure as the API URL.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying server, for custom mocks.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Path of the token exchange for the fixture installation.
    pub fn token_path() -> String {
        format!("/app/installations/{}/access_tokens", TEST_INSTALLATION_ID)
    }

    /// Path of the SCIM user listing for the fixture organization.
    pub fn scim_path() -> String {
        format!("/scim/v2/organizations/{}/Users", TEST_ORG)
    }

    /// Number of requests received on `request_path`.
    pub async fn request_count(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == request_path)
            .count()
    }

    /// Token exchange answering 201 with a long-lived token, exactly once.
    pub async fn mount_token(&self) {
        self.mount_token_with_expiry(FAR_FUTURE).await;
    }

    /// Token exchange answering 201 with a token expiring at `expires_at`.
    pub async fn mount_token_with_expiry(&self, expires_at: &str) {
        Mock::given(method("POST"))
            .and(path(Self::token_path()))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(token_response(TEST_INSTALLATION_TOKEN, expires_at)),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Token exchange that answers only after `delay`.
    pub async fn mount_token_delayed(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(Self::token_path()))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(token_response(TEST_INSTALLATION_TOKEN, FAR_FUTURE))
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Token exchange failing with `status`.
    pub async fn mount_token_failure(&self, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(Self::token_path()))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Member pages, chained by cursor. Each page expects one request.
    pub async fn mount_member_pages(&self, pages: Vec<Vec<Value>>) {
        let last = pages.len().saturating_sub(1);
        for (index, nodes) in pages.into_iter().enumerate() {
            let end_cursor = (index < last).then(|| page_cursor(index + 1));
            let body = members_page(nodes, end_cursor.as_deref());
            self.mount_member_page(index, ResponseTemplate::new(200).set_body_json(body), 1)
                .await;
        }
    }

    /// Answers the member page at `index` with `response`, expecting
    /// `expected` requests (a count or a range).
    pub async fn mount_member_page(&self, index: usize, response: impl Respond + 'static, expected: impl Into<Times>) {
        let cursor = if index == 0 {
            Value::Null
        } else {
            Value::String(page_cursor(index))
        };

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": {"org": TEST_ORG, "cursor": cursor}
            })))
            .respond_with(response)
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// SCIM pages of `page_size` users each. Each page expects one request.
    pub async fn mount_scim_pages(&self, pages: Vec<Vec<Value>>, page_size: usize) {
        let total: usize = pages.iter().map(Vec::len).sum();
        for (index, users) in pages.into_iter().enumerate() {
            let start_index = index * page_size + 1;
            let body = scim_page(total, start_index, users);
            self.mount_scim_page(start_index, ResponseTemplate::new(200).set_body_json(body), 1)
                .await;
        }
    }

    /// Answers the SCIM page starting at `start_index` with `response`,
    /// expecting `expected` requests.
    pub async fn mount_scim_page(&self, start_index: usize, response: impl Respond + 'static, expected: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path(Self::scim_path()))
            .and(query_param("startIndex", start_index.to_string()))
            .and(header("accept", "application/scim+json"))
            .respond_with(response)
            .expect(expected)
            .mount(&self.server)
            .await;
    }
}

/// Replays responses in order, repeating the last one once exhausted.
#[derive(Clone)]
pub struct SequenceResponder {
    responses: Arc<Vec<ResponseTemplate>>,
    count: Arc<AtomicUsize>,
}

impl SequenceResponder {
    /// Creates a responder from a non-empty list of responses.
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty(), "SequenceResponder needs at least one response");
        Self {
            responses: Arc::new(responses),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `failures` responses with `status`, then `success`.
    pub fn fail_then(status: u16, failures: usize, success: ResponseTemplate) -> Self {
        let mut responses = vec![ResponseTemplate::new(status); failures];
        responses.push(success);
        Self::new(responses)
    }

    /// Requests answered so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.count.fetch_add(1, Ordering::SeqCst);
        let index = n.min(self.responses.len() - 1);
        self.responses[index].clone()
    }
}
