//! Shared setup for integration tests against the mock GitHub server.

#![allow(dead_code)]

use drift_github::{
    ApiConfig, EngineConfig, GitHubClient, PersonalToken, RetryPolicy, Settings,
};
use drift_test_utils::{encoded_private_key, MockGitHub, TEST_APP_ID, TEST_INSTALLATION_ID, TEST_ORG};
use std::time::Duration;

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_initial_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
        .with_max_rate_limit_wait(Duration::from_millis(5))
        .without_jitter()
}

/// API settings pointing at `mock`.
pub fn api_config(mock: &MockGitHub, page_size: u32) -> ApiConfig {
    ApiConfig::default()
        .with_api_url(&mock.uri())
        .unwrap()
        .with_page_size(page_size)
        .with_request_timeout(Duration::from_secs(5))
        .with_retry(fast_retry())
}

pub fn client(mock: &MockGitHub, page_size: u32) -> GitHubClient {
    GitHubClient::new(api_config(mock, page_size)).unwrap()
}

/// Client for `mock` with a custom retry policy.
pub fn client_with_retry(mock: &MockGitHub, retry: RetryPolicy) -> GitHubClient {
    GitHubClient::new(api_config(mock, 100).with_retry(retry)).unwrap()
}

/// Client for `mock` whose requests give up after `timeout`.
pub fn client_with_timeout(mock: &MockGitHub, timeout: Duration) -> GitHubClient {
    GitHubClient::new(api_config(mock, 100).with_request_timeout(timeout)).unwrap()
}

/// Settings for the fixture app and organization.
pub fn settings() -> Settings {
    Settings {
        organization: Some(TEST_ORG.to_string()),
        app_id: Some(TEST_APP_ID.to_string()),
        installation_id: Some(TEST_INSTALLATION_ID.to_string()),
        pem_key: Some(encoded_private_key()),
        ..Settings::default()
    }
}

pub fn engine_config(mock: &MockGitHub, page_size: u32) -> EngineConfig {
    EngineConfig::from_settings(settings())
        .unwrap()
        .with_api(api_config(mock, page_size))
}

pub fn pat() -> PersonalToken {
    PersonalToken::new("ghp_testpersonaltoken")
}
