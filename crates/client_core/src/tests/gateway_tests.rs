use super::*;
use crate::{
    test_support::{client_for, reviewer, signed_in, spawn_server, TEST_TOKEN},
    MemoryCredentialStore, StoredCredential,
};
use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use shared::domain::ApplicationStatus;

#[test]
fn endpoints_split_versioned_base_from_health_root() {
    let endpoints = Endpoints::parse("http://localhost:5001/api/v1/").expect("parse");
    assert_eq!(endpoints.api_base(), "http://localhost:5001/api/v1");
    assert_eq!(endpoints.health(), "http://localhost:5001/");
    assert_eq!(
        endpoints.api("/applications/4/status"),
        "http://localhost:5001/api/v1/applications/4/status"
    );
}

#[test]
fn endpoints_without_version_prefix_share_the_same_health_root() {
    let endpoints = Endpoints::parse("https://review.example.com").expect("parse");
    assert_eq!(endpoints.api_base(), "https://review.example.com");
    assert_eq!(endpoints.health(), "https://review.example.com/");
}

#[test]
fn endpoints_reject_non_http_schemes() {
    assert!(matches!(
        Endpoints::parse("ftp://example.com/api/v1"),
        Err(ClientError::Config(_))
    ));
    assert!(matches!(
        Endpoints::parse("not a url"),
        Err(ClientError::Config(_))
    ));
}

#[tokio::test]
async fn conflict_carries_server_message_verbatim() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications/5",
        get(|| async {
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Application already processed" })),
            )
        }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    let err = client
        .api
        .application(ApplicationId(5))
        .await
        .expect_err("conflict");

    assert_eq!(err.user_message(), "Application already processed");
    assert!(matches!(
        err,
        ClientError::Conflict {
            from_server: true,
            ..
        }
    ));
}

#[tokio::test]
async fn server_failure_without_body_gets_generic_message() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications/5",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    let err = client
        .api
        .application(ApplicationId(5))
        .await
        .expect_err("500");

    assert!(matches!(
        err,
        ClientError::Conflict {
            from_server: false,
            ..
        }
    ));
    assert_eq!(err.user_message(), "The request could not be completed");
    assert!(client.session().is_authenticated().await);
}

#[tokio::test]
async fn forbidden_and_missing_map_to_their_own_variants() {
    let server = spawn_server(
        Router::new()
            .route(
                "/api/v1/users",
                get(|| async {
                    (
                        StatusCode::FORBIDDEN,
                        Json(json!({ "error": "Admin access required" })),
                    )
                }),
            )
            .route(
                "/api/v1/applications/404",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({ "error": "Application not found" })),
                    )
                }),
            ),
    )
    .await;
    let client = signed_in(&server, reviewer()).await;

    let err = client.api.users().await.expect_err("403");
    assert!(matches!(&err, ClientError::NotPermitted(message) if message == "Admin access required"));

    let err = client
        .api
        .application(ApplicationId(404))
        .await
        .expect_err("404");
    assert!(matches!(&err, ClientError::NotFound(message) if message == "Application not found"));
}

#[tokio::test]
async fn unauthorized_response_ends_the_session() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications/5",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "msg": "Token has expired" })),
            )
        }),
    ))
    .await;
    let store = Arc::new(MemoryCredentialStore::with_credential(StoredCredential {
        access_token: TEST_TOKEN.into(),
        user: Some(reviewer()),
    }));
    let client = client_for(&server.api_url(), store.clone());
    client
        .session()
        .install(crate::Session {
            token: TEST_TOKEN.into(),
            user: Some(reviewer()),
        })
        .await;

    let err = client
        .api
        .application(ApplicationId(5))
        .await
        .expect_err("401");

    assert!(err.requires_reauth());
    assert!(!client.session().is_authenticated().await);
    assert!(crate::CredentialStore::load(store.as_ref())
        .expect("load")
        .is_none());

    let err = client
        .api
        .application(ApplicationId(5))
        .await
        .expect_err("signed out");
    assert!(matches!(err, ClientError::NotAuthenticated));
    assert_eq!(server.recorder.count("GET", "/api/v1/applications/5"), 1);
}

#[tokio::test]
async fn authenticated_calls_carry_the_bearer_credential() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications/5",
        get(|| async { Json(crate::test_support::detail_json(5, "flagged")) }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    let detail = client
        .api
        .application(ApplicationId(5))
        .await
        .expect("detail");

    assert_eq!(detail.status, ApplicationStatus::Flagged);
    assert!(detail.documents.is_none());
    let requests = server.recorder.matching("GET", "/api/v1/applications/5");
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some(format!("Bearer {TEST_TOKEN}").as_str())
    );
}
