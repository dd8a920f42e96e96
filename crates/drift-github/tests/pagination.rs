//! Page walking over the mock GraphQL and SCIM endpoints.

mod common;

use drift_github::{
    fetch_all_members, fetch_all_scim_identities, AccessToken, DataSource, FetchErrorKind, RetryPolicy,
};
use drift_test_utils::{
    generate_members, generate_scim_users, graphql_errors, graphql_rate_limited, members_page, scim_page,
    MockGitHub, SequenceResponder, TEST_ORG,
};
use std::collections::HashSet;
use std::time::Duration;
use time::macros::datetime;
use time::OffsetDateTime;
use wiremock::ResponseTemplate;

async fn assert_member_pages(page_count: usize) {
    let mock = MockGitHub::start().await;
    let pages: Vec<_> = (0..page_count)
        .map(|page| generate_members(&format!("page{}", page), 3))
        .collect();
    mock.mount_member_pages(pages).await;

    let client = common::client(&mock, 3);
    let members = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap();

    assert_eq!(members.len(), page_count * 3);
    let logins: HashSet<_> = members.iter().map(|m| m.login.as_str()).collect();
    assert_eq!(logins.len(), members.len());
    assert_eq!(mock.request_count("/graphql").await, page_count);
}

#[tokio::test]
async fn test_members_single_page() {
    assert_member_pages(1).await;
}

#[tokio::test]
async fn test_members_two_pages() {
    assert_member_pages(2).await;
}

#[tokio::test]
async fn test_members_ten_pages() {
    assert_member_pages(10).await;
}

#[tokio::test]
async fn test_members_short_page_does_not_stop_cursor_walk() {
    let mock = MockGitHub::start().await;
    mock.mount_member_pages(vec![
        generate_members("a", 1),
        generate_members("b", 3),
        generate_members("c", 2),
    ])
    .await;

    let client = common::client(&mock, 3);
    let members = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap();

    assert_eq!(members.len(), 6);
    assert_eq!(members[0].login, "a-0");
    assert_eq!(members[5].login, "c-1");
}

#[tokio::test]
async fn test_members_keep_retrieval_order() {
    let mock = MockGitHub::start().await;
    mock.mount_member_pages(vec![generate_members("z", 2), generate_members("a", 2)])
        .await;

    let client = common::client(&mock, 2);
    let members = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap();
    let logins: Vec<_> = members.iter().map(|m| m.login.as_str()).collect();

    assert_eq!(logins, vec!["z-0", "z-1", "a-0", "a-1"]);
}

#[tokio::test]
async fn test_graphql_errors_are_fatal() {
    let mock = MockGitHub::start().await;
    mock.mount_member_page(
        0,
        ResponseTemplate::new(200).set_body_json(graphql_errors(&["Resource not accessible by integration"])),
        1,
    )
    .await;

    let client = common::client(&mock, 100);
    let error = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap_err();

    assert_eq!(error.data_source, DataSource::Members);
    assert!(matches!(error.kind, FetchErrorKind::GraphQl(_)));
}

#[tokio::test]
async fn test_scim_stops_on_short_page() {
    let mock = MockGitHub::start().await;
    let users = generate_scim_users("user", 5);
    mock.mount_scim_pages(vec![users[0..2].to_vec(), users[2..4].to_vec(), users[4..].to_vec()], 2)
        .await;

    let client = common::client(&mock, 2);
    let identities = fetch_all_scim_identities(&client, &common::pat(), TEST_ORG)
        .await
        .unwrap();

    assert_eq!(identities.len(), 5);
    assert_eq!(identities[4].primary_email.as_deref(), Some("user-4@acme.com"));
    assert_eq!(mock.request_count(&MockGitHub::scim_path()).await, 3);
}

#[tokio::test]
async fn test_scim_stops_at_total_results() {
    let mock = MockGitHub::start().await;
    let users = generate_scim_users("user", 4);
    mock.mount_scim_pages(vec![users[0..2].to_vec(), users[2..].to_vec()], 2)
        .await;

    let client = common::client(&mock, 2);
    let identities = fetch_all_scim_identities(&client, &common::pat(), TEST_ORG)
        .await
        .unwrap();

    assert_eq!(identities.len(), 4);
    assert_eq!(mock.request_count(&MockGitHub::scim_path()).await, 2);
}

#[tokio::test]
async fn test_scim_empty_listing() {
    let mock = MockGitHub::start().await;
    mock.mount_scim_page(1, ResponseTemplate::new(200).set_body_json(scim_page(0, 1, vec![])), 1)
        .await;

    let client = common::client(&mock, 100);
    let identities = fetch_all_scim_identities(&client, &common::pat(), TEST_ORG)
        .await
        .unwrap();

    assert!(identities.is_empty());
}

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let mock = MockGitHub::start().await;
    let responder = SequenceResponder::new(vec![
        ResponseTemplate::new(429).insert_header("retry-after", "0"),
        ResponseTemplate::new(403)
            .insert_header("x-ratelimit-limit", "5000")
            .insert_header("x-ratelimit-remaining", "0")
            .insert_header("x-ratelimit-reset", "0"),
        ResponseTemplate::new(200).set_body_json(members_page(generate_members("m", 2), None)),
    ]);
    mock.mount_member_page(0, responder.clone(), 3).await;

    let client = common::client(&mock, 100);
    let members = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap();

    assert_eq!(members.len(), 2);
    assert_eq!(responder.count(), 3);
}

#[tokio::test]
async fn test_rate_limit_budget_is_bounded() {
    let mock = MockGitHub::start().await;
    mock.mount_member_page(0, ResponseTemplate::new(429).insert_header("retry-after", "1"), 5)
        .await;

    let client = common::client(&mock, 100);
    let error = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap_err();

    assert_eq!(error.kind, FetchErrorKind::RateLimited { attempts: 5 });
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock = MockGitHub::start().await;
    let success = ResponseTemplate::new(200).set_body_json(scim_page(1, 1, generate_scim_users("u", 1)));
    mock.mount_scim_page(1, SequenceResponder::fail_then(502, 2, success), 3)
        .await;

    let client = common::client(&mock, 100);
    let identities = fetch_all_scim_identities(&client, &common::pat(), TEST_ORG)
        .await
        .unwrap();

    assert_eq!(identities.len(), 1);
}

#[tokio::test]
async fn test_failure_after_first_page_returns_no_items() {
    let mock = MockGitHub::start().await;
    mock.mount_member_page(
        0,
        ResponseTemplate::new(200).set_body_json(members_page(
            generate_members("first", 2),
            Some(&drift_test_utils::mock::page_cursor(1)),
        )),
        1,
    )
    .await;
    mock.mount_member_page(1, ResponseTemplate::new(500), 3).await;

    let client = common::client(&mock, 2);
    let error = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap_err();

    assert_eq!(error.data_source, DataSource::Members);
    assert_eq!(
        error.kind,
        FetchErrorKind::ExhaustedRetries {
            attempts: 3,
            last_status: Some(500)
        }
    );
}

#[tokio::test]
async fn test_malformed_page_is_invalid_response() {
    let mock = MockGitHub::start().await;
    mock.mount_scim_page(1, ResponseTemplate::new(200).set_body_string("<html>oops</html>"), 1)
        .await;

    let client = common::client(&mock, 100);
    let error = fetch_all_scim_identities(&client, &common::pat(), TEST_ORG)
        .await
        .unwrap_err();

    assert_eq!(error.data_source, DataSource::ScimIdentities);
    assert!(matches!(error.kind, FetchErrorKind::InvalidResponse(_)));
}

#[tokio::test]
async fn test_expired_token_is_not_used() {
    let mock = MockGitHub::start().await;
    let expired = AccessToken::new("ghs_expired", datetime!(2001-01-01 00:00:00 UTC));

    let client = common::client(&mock, 100);
    let error = fetch_all_scim_identities(&client, &expired, TEST_ORG)
        .await
        .unwrap_err();

    assert!(matches!(error.kind, FetchErrorKind::TokenExpired(_)));
    assert_eq!(mock.request_count(&MockGitHub::scim_path()).await, 0);
}

#[tokio::test]
async fn test_token_expiring_during_backoff_is_not_resent() {
    let mock = MockGitHub::start().await;
    let success = ResponseTemplate::new(200).set_body_json(scim_page(1, 1, generate_scim_users("u", 1)));
    let responder = SequenceResponder::fail_then(502, 1, success);
    mock.mount_scim_page(1, responder.clone(), 1).await;

    let slow_retry = RetryPolicy::default()
        .with_initial_delay(Duration::from_secs(2))
        .with_max_delay(Duration::from_secs(2))
        .without_jitter();
    let client = common::client_with_retry(&mock, slow_retry);
    let token = AccessToken::new(
        "ghs_shortlived",
        OffsetDateTime::now_utc() + time::Duration::seconds(1),
    );

    let error = fetch_all_scim_identities(&client, &token, TEST_ORG)
        .await
        .unwrap_err();

    assert_eq!(error.data_source, DataSource::ScimIdentities);
    assert!(matches!(error.kind, FetchErrorKind::TokenExpired(_)));
    assert_eq!(responder.count(), 1);
}

#[tokio::test]
async fn test_graphql_rate_limit_with_ok_status_is_retried() {
    let mock = MockGitHub::start().await;
    let responder = SequenceResponder::new(vec![
        ResponseTemplate::new(200)
            .insert_header("x-ratelimit-limit", "5000")
            .insert_header("x-ratelimit-remaining", "0")
            .insert_header("x-ratelimit-reset", "0")
            .set_body_json(graphql_rate_limited()),
        ResponseTemplate::new(200).set_body_json(members_page(generate_members("m", 2), None)),
    ]);
    mock.mount_member_page(0, responder.clone(), 2).await;

    let client = common::client(&mock, 100);
    let members = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap();

    assert_eq!(members.len(), 2);
    assert_eq!(responder.count(), 2);
}

#[tokio::test]
async fn test_graphql_rate_limit_budget_is_bounded() {
    let mock = MockGitHub::start().await;
    mock.mount_member_page(
        0,
        ResponseTemplate::new(200)
            .insert_header("retry-after", "1")
            .set_body_json(graphql_rate_limited()),
        5,
    )
    .await;

    let client = common::client(&mock, 100);
    let error = fetch_all_members(&client, &common::pat(), TEST_ORG).await.unwrap_err();

    assert_eq!(error.data_source, DataSource::Members);
    assert_eq!(error.kind, FetchErrorKind::RateLimited { attempts: 5 });
}

#[tokio::test]
async fn test_page_timeouts_end_as_timeout() {
    let mock = MockGitHub::start().await;
    mock.mount_scim_page(
        1,
        ResponseTemplate::new(200)
            .set_body_json(scim_page(0, 1, vec![]))
            .set_delay(Duration::from_millis(500)),
        3,
    )
    .await;

    let client = common::client_with_timeout(&mock, Duration::from_millis(100));
    let error = fetch_all_scim_identities(&client, &common::pat(), TEST_ORG)
        .await
        .unwrap_err();

    assert_eq!(error.data_source, DataSource::ScimIdentities);
    assert_eq!(error.kind, FetchErrorKind::Timeout);
}
