//! GitHub App authentication.
//!
//! A GitHub App proves its identity with a short-lived RS256 assertion signed
//! by its private key, then exchanges that assertion for an installation
//! access token scoped to one organization.
//!
//! # Flow
//!
//! 1. `sign_assertion()` builds the assertion (`iss` = app ID, lifetime under
//!    the ten minutes GitHub accepts)
//! 2. `AppAuthenticator::authenticate()` posts it to
//!    `/app/installations/{id}/access_tokens`
//! 3. The returned [`AccessToken`] is used read-only for the rest of the run
//!
//! There is exactly one exchange call per run and no retry: a failure here
//! is a credential problem for the operator to fix.

use crate::client::{GitHubClient, GITHUB_JSON};
use crate::config::{ApiConfig, AppCredentials};
use crate::error::AuthError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

/// Seconds the assertion is backdated to absorb clock drift.
pub const ASSERTION_BACKDATE_SECS: i64 = 60;

/// Seconds the assertion stays valid after signing.
pub const ASSERTION_LIFETIME_SECS: i64 = 8 * 60;

/// Longest assertion lifetime GitHub accepts.
pub const MAX_ASSERTION_LIFETIME_SECS: i64 = 10 * 60;

/// A credential that can be sent as a bearer token.
pub trait Bearer: Send + Sync {
    /// The secret token value.
    fn secret(&self) -> &str;

    /// When the token stops being valid, if known.
    fn expires_at(&self) -> Option<OffsetDateTime>;

    /// Whether the token is past its expiry at `now`.
    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }
}

/// Claims of the GitHub App assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issuer: the GitHub App ID.
    pub iss: String,
}

/// Signs a GitHub App assertion valid from one minute before `now`.
///
/// # Errors
///
/// Returns `AuthError::InvalidKey` if the private key is not an RSA PEM key.
pub fn sign_assertion(credentials: &AppCredentials, now: OffsetDateTime) -> Result<String, AuthError> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key())
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

    let now = now.unix_timestamp();
    let claims = AssertionClaims {
        iat: now - ASSERTION_BACKDATE_SECS,
        exp: now + ASSERTION_LIFETIME_SECS,
        iss: credentials.app_id.clone(),
    };

    encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Body of a successful token exchange.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(with = "time::serde::rfc3339")]
    expires_at: OffsetDateTime,
    #[serde(default)]
    permissions: BTreeMap<String, String>,
    #[serde(default)]
    repository_selection: Option<String>,
}

/// Installation access token returned by the token exchange.
#[derive(Clone, Deserialize)]
#[serde(from = "TokenResponse")]
pub struct AccessToken {
    value: Zeroizing<String>,
    expires_at: OffsetDateTime,
    permissions: BTreeMap<String, String>,
    repository_selection: Option<String>,
}

impl From<TokenResponse> for AccessToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            value: Zeroizing::new(response.token),
            expires_at: response.expires_at,
            permissions: response.permissions,
            repository_selection: response.repository_selection,
        }
    }
}

impl AccessToken {
    /// Creates a token from its value and expiry.
    pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
            expires_at,
            permissions: BTreeMap::new(),
            repository_selection: None,
        }
    }

    /// Expiry of the token.
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Permissions granted to the installation, e.g. `members: read`.
    pub fn permissions(&self) -> &BTreeMap<String, String> {
        &self.permissions
    }

    /// Whether the token is past its expiry now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

impl Bearer for AccessToken {
    fn secret(&self) -> &str {
        &self.value
    }

    fn expires_at(&self) -> Option<OffsetDateTime> {
        Some(self.expires_at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("permissions", &self.permissions)
            .field("repository_selection", &self.repository_selection)
            .finish()
    }
}

/// A personal access token supplied by the operator.
///
/// Used for the member query when the installation token lacks access to
/// verified domain emails. It has no known expiry.
#[derive(Clone)]
pub struct PersonalToken(Zeroizing<String>);

impl PersonalToken {
    /// Wraps a token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }
}

impl Bearer for PersonalToken {
    fn secret(&self) -> &str {
        &self.0
    }

    fn expires_at(&self) -> Option<OffsetDateTime> {
        None
    }
}

impl fmt::Debug for PersonalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PersonalToken(<redacted>)")
    }
}

/// Exchanges GitHub App credentials for an installation token.
#[derive(Debug, Clone)]
pub struct AppAuthenticator {
    http_client: reqwest::Client,
    api: ApiConfig,
}

impl AppAuthenticator {
    /// Creates an authenticator that talks to `client`'s API.
    pub fn new(client: &GitHubClient) -> Self {
        Self {
            http_client: client.http().clone(),
            api: client.api().clone(),
        }
    }

    /// Obtains an installation access token.
    ///
    /// Makes exactly one network call.
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if the private key cannot be parsed
    /// - `TokenExchangeFailed` if GitHub answers with a non-2xx status
    /// - `Timeout` if the call times out
    /// - `Network` / `InvalidResponse` for transport or body failures
    pub async fn authenticate(&self, credentials: &AppCredentials) -> Result<AccessToken, AuthError> {
        let assertion = Zeroizing::new(sign_assertion(credentials, OffsetDateTime::now_utc())?);
        let installation_id = credentials.installation_id.to_string();
        let url = self
            .api
            .endpoint(["app", "installations", installation_id.as_str(), "access_tokens"]);

        debug!(
            "requesting installation token for app {} installation {}",
            credentials.app_id, credentials.installation_id
        );

        let response = self
            .http_client
            .post(url)
            .header(ACCEPT, GITHUB_JSON)
            .bearer_auth(assertion.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Timeout
                } else {
                    AuthError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!("failed to get installation token from GitHub API: {} - {}", status, body);
            return Err(AuthError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: AccessToken = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AuthError::Timeout
            } else {
                AuthError::InvalidResponse(e.to_string())
            }
        })?;

        if token.is_expired() {
            return Err(AuthError::InvalidResponse(format!(
                "token already expired at {}",
                token.expires_at
            )));
        }

        info!("obtained installation token expiring at {}", token.expires_at);
        debug!("installation token permissions: {:?}", token.permissions());
        Ok(token)
    }
}
