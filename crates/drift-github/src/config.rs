//! Engine configuration.
//!
//! Raw values (usually from the environment) arrive as [`Settings`] and are
//! validated into an [`EngineConfig`] before anything touches the network.

use crate::auth::PersonalToken;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use base64::Engine as _;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use zeroize::Zeroizing;

/// Public GitHub API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Items requested per page from both sources.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the GitHub App private key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Base64-encoded PEM, as passed in `GH_PEM_KEY`.
    Inline(Zeroizing<String>),
    /// Path to a PEM file, as passed in `GH_PEM_KEY_PATH`.
    File(PathBuf),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Inline(_) => f.write_str("Inline(<redacted>)"),
            KeySource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl KeySource {
    /// Picks the key source from the two optional inputs.
    ///
    /// Exactly one must be present; blank values count as absent.
    pub fn from_options(inline: Option<String>, path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let inline = inline.filter(|value| !value.trim().is_empty());
        let path = path.filter(|value| !value.as_os_str().is_empty());

        match (inline, path) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingKeySource),
            (Some(inline), None) => Ok(KeySource::Inline(Zeroizing::new(inline))),
            (None, Some(path)) => Ok(KeySource::File(path)),
            (None, None) => Err(ConfigError::MissingCredential("GH_PEM_KEY or GH_PEM_KEY_PATH")),
        }
    }

    /// Loads the PEM bytes.
    pub fn load(&self) -> Result<PrivateKey, ConfigError> {
        match self {
            KeySource::Inline(encoded) => {
                let compact: Zeroizing<String> =
                    Zeroizing::new(encoded.chars().filter(|c| !c.is_whitespace()).collect());
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| ConfigError::InvalidKeyEncoding(e.to_string()))?;
                Ok(PrivateKey::new(decoded))
            }
            KeySource::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| ConfigError::KeyFileUnreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(PrivateKey::new(bytes))
            }
        }
    }
}

/// PEM-encoded private key material, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(Zeroizing<Vec<u8>>);

impl PrivateKey {
    /// Wraps raw PEM bytes.
    pub fn new(pem: Vec<u8>) -> Self {
        Self(Zeroizing::new(pem))
    }

    /// The PEM bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(<{} bytes redacted>)", self.0.len())
    }
}

/// GitHub App identity used to obtain an installation token.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    /// GitHub App ID, used as the assertion issuer.
    pub app_id: String,
    /// Installation of the app on the target organization.
    pub installation_id: u64,
    private_key: PrivateKey,
}

impl AppCredentials {
    /// Creates credentials from their parts.
    pub fn new(app_id: impl Into<String>, installation_id: u64, private_key: PrivateKey) -> Self {
        Self {
            app_id: app_id.into(),
            installation_id,
            private_key,
        }
    }

    /// PEM bytes of the private key.
    pub fn private_key(&self) -> &[u8] {
        self.private_key.as_bytes()
    }
}

/// HTTP-level settings shared by every request.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// REST base URL.
    pub api_url: Url,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Items requested per page.
    pub page_size: u32,
    /// Retry policy for page requests.
    pub retry: RetryPolicy,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            user_agent: format!("scim-drift/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    /// Points the configuration at another API base URL (GitHub Enterprise
    /// Server, or a mock server in tests).
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidApiUrl {
            url: url.to_string(),
            reason,
        };

        let mut parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("expected an http:// or https:// URL".to_string()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("query strings and fragments are not allowed".to_string()));
        }
        if let Ok(mut segments) = parsed.path_segments_mut() {
            segments.pop_if_empty();
        }

        self.api_url = parsed;
        Ok(self)
    }

    /// Sets the page size, clamped to GitHub's 1..=100 range.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// REST endpoint below the base URL. Each segment is percent-encoded.
    pub fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GraphQL endpoint for this API base URL.
    ///
    /// Enterprise Server serves REST under `/api/v3` and GraphQL under
    /// `/api/graphql`.
    pub fn graphql_url(&self) -> Url {
        let enterprise = self.api_url.path().trim_end_matches('/').ends_with("/api/v3");
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            if enterprise {
                path.pop();
            }
            path.push("graphql");
        }
        url
    }
}

/// Unvalidated settings, one field per input.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// `GH_ORG`
    pub organization: Option<String>,
    /// `GH_APP_ID`
    pub app_id: Option<String>,
    /// `GH_INSTALL_ID`
    pub installation_id: Option<String>,
    /// `GH_PEM_KEY`
    pub pem_key: Option<String>,
    /// `GH_PEM_KEY_PATH`
    pub pem_key_path: Option<PathBuf>,
    /// `GH_PAT_TOKEN`
    pub pat_token: Option<String>,
    /// `GH_API_URL`
    pub api_url: Option<String>,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Organization login.
    pub organization: String,
    /// GitHub App credentials.
    pub credentials: AppCredentials,
    /// Token for the member query; the installation token is used when absent.
    pub member_token: Option<PersonalToken>,
    /// HTTP settings.
    pub api: ApiConfig,
}

impl EngineConfig {
    /// Validates raw settings, reading the private key.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for missing values, a missing or doubled key
    /// source, an unreadable key, or an unusable URL.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let organization = required(settings.organization, "GH_ORG")?;
        let app_id = required(settings.app_id, "GH_APP_ID")?;
        let raw_installation_id = required(settings.installation_id, "GH_INSTALL_ID")?;
        let installation_id = raw_installation_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ConfigError::InvalidInstallationId(raw_installation_id))?;

        let key = KeySource::from_options(settings.pem_key, settings.pem_key_path)?.load()?;

        let mut api = ApiConfig::default();
        if let Some(url) = settings.api_url.filter(|url| !url.trim().is_empty()) {
            api = api.with_api_url(&url)?;
        }

        let member_token = settings
            .pat_token
            .filter(|token| !token.trim().is_empty())
            .map(PersonalToken::new);

        Ok(Self {
            organization,
            credentials: AppCredentials::new(app_id, installation_id, key),
            member_token,
            api,
        })
    }

    /// Replaces the HTTP settings.
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}
