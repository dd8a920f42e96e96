//! Sequential page walking over paginated GitHub endpoints.
//!
//! A [`PageSource`] describes one endpoint: how to request a page for a
//! cursor, how to pull items out of a response, and what cursor comes next.
//! [`PageWalker`] drives any source to completion, one request at a time.
//!
//! The walker only stops when the source says there is no next page. Whether
//! a short page means "done" is the source's call: true for SCIM's
//! offset-based listing, false for GraphQL, where the cursor is authoritative.

use crate::auth::Bearer;
use crate::client::GitHubClient;
use crate::error::{DataSource, FetchError, FetchErrorKind};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, info};

/// A paginated endpoint.
pub trait PageSource {
    /// Position in the listing.
    type Cursor: Clone + fmt::Debug;
    /// Deserialized response body of one page.
    type Response: DeserializeOwned;
    /// Record produced by the source.
    type Item;

    /// Which data set this source reads.
    fn data_source(&self) -> DataSource;

    /// Cursor of the first page.
    fn first_cursor(&self) -> Self::Cursor;

    /// Builds the request for the page at `cursor`, without authentication.
    fn request(&self, client: &GitHubClient, cursor: &Self::Cursor) -> reqwest::RequestBuilder;

    /// Whether a successfully decoded page is really a rate limit signal.
    ///
    /// Such a page is discarded and requested again after the rate limit
    /// wait.
    fn is_rate_limited(&self, _response: &Self::Response) -> bool {
        false
    }

    /// Extracts the records of one page.
    fn items(&self, response: &Self::Response) -> Result<Vec<Self::Item>, FetchErrorKind>;

    /// Cursor of the page after `cursor`, or `None` when the listing is done.
    ///
    /// `received` is the number of items [`PageSource::items`] returned for
    /// this page.
    fn next_cursor(
        &self,
        cursor: &Self::Cursor,
        response: &Self::Response,
        received: usize,
    ) -> Result<Option<Self::Cursor>, FetchErrorKind>;
}

/// Walks a [`PageSource`] from its first page to its last.
pub struct PageWalker<'a> {
    client: &'a GitHubClient,
    token: &'a dyn Bearer,
}

impl<'a> PageWalker<'a> {
    /// Creates a walker that authenticates every request with `token`.
    pub fn new(client: &'a GitHubClient, token: &'a dyn Bearer) -> Self {
        Self { client, token }
    }

    /// Fetches every page of `source` and returns the concatenated items.
    ///
    /// Pages are requested strictly one after another. If any page fails
    /// after retries, or the token expires before a request, the whole walk
    /// fails; no truncated list is returned.
    pub async fn walk<S: PageSource>(&self, source: &S) -> Result<Vec<S::Item>, FetchError> {
        let data_source = source.data_source();
        let fail = |kind: FetchErrorKind| FetchError::new(data_source, kind);

        let mut cursor = source.first_cursor();
        let mut items = Vec::new();
        let mut pages = 0u32;

        loop {
            let body: S::Response = self
                .client
                .execute(
                    data_source,
                    self.token,
                    || source.request(self.client, &cursor),
                    |body: &S::Response| source.is_rate_limited(body),
                )
                .await?;
            pages += 1;

            let page_items = source.items(&body).map_err(fail)?;
            let next = source
                .next_cursor(&cursor, &body, page_items.len())
                .map_err(fail)?;

            debug!(
                "{} page {} at {:?}: {} items",
                data_source,
                pages,
                cursor,
                page_items.len()
            );
            items.extend(page_items);

            match next {
                Some(next) => cursor = next,
                None => break,
            }
        }

        info!("fetched {} {} in {} pages", items.len(), data_source, pages);
        Ok(items)
    }
}
