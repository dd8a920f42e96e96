//! Full CLI runs against a mock GitHub.

use clap::Parser;
use drift_cli::args::Args;
use drift_cli::exit_codes::ExitCode;
use drift_cli::run::execute;
use drift_test_utils::{
    encoded_private_key, member_node, scim_user, MockGitHub, TEST_APP_ID, TEST_INSTALLATION_ID,
    TEST_ORG,
};
use tempfile::NamedTempFile;

fn args(mock: &MockGitHub, extra: &[&str]) -> Args {
    let key = encoded_private_key();
    let installation_id = TEST_INSTALLATION_ID.to_string();
    let uri = mock.uri();
    let mut argv = vec![
        "scim-drift",
        "--org",
        TEST_ORG,
        "--app-id",
        TEST_APP_ID,
        "--install-id",
        installation_id.as_str(),
        "--pem-key",
        key.as_str(),
        "--api-url",
        uri.as_str(),
        "--no-color",
        "-o",
        "txt",
    ];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).unwrap()
}

async fn mount_drift(mock: &MockGitHub) {
    mock.mount_token().await;
    mock.mount_member_pages(vec![vec![
        member_node("alice", &["alice@acme.com"]),
        member_node("mallory", &["mallory@acme.com"]),
    ]])
    .await;
    mock.mount_scim_pages(vec![vec![scim_user("s1", "alice@acme.com", true)]], 100)
        .await;
}

#[tokio::test]
async fn test_drift_is_informational_by_default() {
    let mock = MockGitHub::start().await;
    mount_drift(&mock).await;

    let code = execute(&args(&mock, &[])).await.unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[tokio::test]
async fn test_fail_on_drift() {
    let mock = MockGitHub::start().await;
    mount_drift(&mock).await;

    let code = execute(&args(&mock, &["--fail-on-drift"])).await.unwrap();
    assert_eq!(code, ExitCode::DriftDetected);
}

#[tokio::test]
async fn test_step_summary_is_written() {
    let mock = MockGitHub::start().await;
    mount_drift(&mock).await;
    let summary = NamedTempFile::new().unwrap();
    let path = summary.path().to_str().unwrap().to_string();

    execute(&args(&mock, &["--summary-file", &path])).await.unwrap();

    let contents = std::fs::read_to_string(summary.path()).unwrap();
    assert!(contents.contains("## SCIM drift report for `acme`"));
    assert!(contents.contains("- `mallory`"));
}

#[tokio::test]
async fn test_auth_failure_maps_to_auth_exit_code() {
    let mock = MockGitHub::start().await;
    mock.mount_token_failure(401, "Bad credentials").await;

    let error = execute(&args(&mock, &[])).await.unwrap_err();
    assert_eq!(ExitCode::from_anyhow_error(&error), ExitCode::AuthError);
}

#[tokio::test]
async fn test_missing_organization_is_a_config_error() {
    let mock = MockGitHub::start().await;
    let mut parsed = args(&mock, &[]);
    parsed.org = None;

    let error = execute(&parsed).await.unwrap_err();
    assert_eq!(ExitCode::from_anyhow_error(&error), ExitCode::InvalidArgs);
    assert!(mock.server().received_requests().await.unwrap().is_empty());
}
