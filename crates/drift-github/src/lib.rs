//! GitHub access layer for scim-drift.
//!
//! This crate authenticates as a GitHub App installation and retrieves the two
//! data sets the drift comparison needs: organization members with their
//! verified domain emails (GraphQL, cursor-paginated) and the organization's
//! SCIM identities (REST, page-paginated). All access is read-only.
//!
//! # Modules
//!
//! - `auth`: GitHub App assertion signing and installation token exchange
//! - `client`: HTTP client, rate limit headers and response classification
//! - `config`: Validated engine configuration
//! - `engine`: The single-pass run (authenticate, fetch, compare)
//! - `error`: Configuration, authentication and fetch errors
//! - `members`: Organization member source (GraphQL)
//! - `pagination`: Generic sequential page walker
//! - `retry`: Retry and backoff policy
//! - `scim`: SCIM identity source (REST)

#![deny(missing_docs)]
#![deny(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod members;
pub mod pagination;
pub mod retry;
pub mod scim;

// Re-export commonly used types
pub use auth::{AccessToken, AppAuthenticator, Bearer, PersonalToken};
pub use client::{GitHubClient, RateLimitInfo, ResponseClass};
pub use config::{ApiConfig, AppCredentials, EngineConfig, KeySource, Settings};
pub use engine::DriftEngine;
pub use error::{AuthError, ConfigError, DataSource, DriftError, FetchError, FetchErrorKind, Result};
pub use members::fetch_all_members;
pub use pagination::{PageSource, PageWalker};
pub use retry::RetryPolicy;
pub use scim::fetch_all_scim_identities;
