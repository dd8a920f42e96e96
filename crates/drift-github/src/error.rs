//! Error types for configuration, authentication and retrieval.
//!
//! Every error here is terminal to a run. The engine returns a single
//! [`DriftError`] to its caller, which owns exit codes and user-facing
//! formatting.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The remote data set a fetch was reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Organization members (GraphQL).
    Members,
    /// SCIM identities (REST).
    ScimIdentities,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Members => f.write_str("organization members"),
            DataSource::ScimIdentities => f.write_str("SCIM identities"),
        }
    }
}

/// Invalid or incomplete configuration, detected before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing required setting: {0}")]
    MissingCredential(&'static str),

    /// Both private key sources were supplied.
    #[error("conflicting private key sources: set exactly one of GH_PEM_KEY or GH_PEM_KEY_PATH")]
    ConflictingKeySource,

    /// The inline private key is not valid base64.
    #[error("GH_PEM_KEY is not valid base64: {0}")]
    InvalidKeyEncoding(String),

    /// The private key file could not be read.
    #[error("cannot read private key file {}: {reason}", .path.display())]
    KeyFileUnreadable {
        /// Path that was tried.
        path: PathBuf,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The installation ID is not a positive integer.
    #[error("invalid installation ID {0:?}: expected a positive integer")]
    InvalidInstallationId(String),

    /// The API base URL is unusable.
    #[error("invalid API URL {url:?}: {reason}")]
    InvalidApiUrl {
        /// URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to initialize HTTP client: {0}")]
    HttpClient(String),
}

/// Failure to obtain an installation access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The private key could not be parsed or used for signing.
    #[error("invalid GitHub App private key: {0}")]
    InvalidKey(String),

    /// The token exchange endpoint answered with a non-2xx status.
    #[error("installation token exchange failed with HTTP {status}: {body}")]
    TokenExchangeFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The token exchange call timed out.
    #[error("installation token exchange timed out")]
    Timeout,

    /// The token exchange call failed below HTTP.
    #[error("network error during installation token exchange: {0}")]
    Network(String),

    /// The token exchange answered 2xx with an unusable body.
    #[error("unexpected installation token response: {0}")]
    InvalidResponse(String),
}

/// What went wrong while walking a paginated source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    /// Still rate limited after the bounded number of waits.
    #[error("GitHub API rate limit still exceeded after {attempts} attempts")]
    RateLimited {
        /// Requests made while rate limited.
        attempts: u32,
    },

    /// A status the retry policy does not handle (for example a redirect).
    #[error("unexpected HTTP status {status}")]
    HttpFailure {
        /// HTTP status code.
        status: u16,
    },

    /// Every attempt timed out.
    #[error("request timed out")]
    Timeout,

    /// Every attempt failed.
    #[error("gave up after {attempts} attempts (last status: {})", describe_status(.last_status))]
    ExhaustedRetries {
        /// Attempts made.
        attempts: u32,
        /// Status of the last failed attempt, if it got a response.
        last_status: Option<u16>,
    },

    /// The response body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The GraphQL endpoint reported errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    /// The bearer token expired before the fetch completed.
    #[error("access token expired at {0}")]
    TokenExpired(String),
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "no response".to_string(),
    }
}

/// A terminal failure of one data source.
///
/// No partial result accompanies this error: a truncated member or identity
/// list would produce false drift.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch {data_source}: {kind}")]
pub struct FetchError {
    /// Source being fetched.
    pub data_source: DataSource,
    /// What went wrong.
    pub kind: FetchErrorKind,
}

impl FetchError {
    /// Creates a fetch error for `data_source`.
    pub fn new(data_source: DataSource, kind: FetchErrorKind) -> Self {
        Self { data_source, kind }
    }
}

/// The single error a run returns.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A data source could not be fetched completely.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl DriftError {
    /// Checks if this error indicates an authentication problem.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, DriftError::Auth(_))
    }

    /// Checks if this error was caused by configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, DriftError::Config(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, DriftError>;
