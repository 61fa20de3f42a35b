use std::sync::Mutex as StdMutex;

use super::*;
use crate::test_support::{admin, reviewer, signed_in, spawn_server, summary_json, unique_temp_dir};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::RiskLevel;

fn dashboard_json() -> Value {
    json!({ "summary": {
        "total": 12, "pending": 5, "approved": 4, "flagged": 3, "avg_risk_score": 61.5
    } })
}

#[test]
fn export_file_is_named_after_the_day() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
    assert_eq!(export_filename(date), "applications_2024-03-09.csv");
}

#[tokio::test]
async fn submission_requires_company_name_and_email() {
    let server = spawn_server(Router::new()).await;
    let client = signed_in(&server, reviewer()).await;

    let mut application = NewApplication::default();
    application.profile.email = "ops@acme.test".into();
    let err = client
        .submit_application(&application)
        .await
        .expect_err("no company");
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingField("Company name"))
    ));

    application.profile.company_name = "Acme".into();
    application.profile.email = "  ".into();
    let err = client
        .submit_application(&application)
        .await
        .expect_err("no email");
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingField("Email"))
    ));
    assert!(server.recorder.all().is_empty());
}

#[tokio::test]
async fn submission_posts_vendor_defaults_and_presents_verdict() {
    let captured = Arc::new(StdMutex::new(Value::Null));
    let server = spawn_server(
        Router::new()
            .route(
                "/api/v1/applications",
                post(
                    |State(captured): State<Arc<StdMutex<Value>>>, Json(body): Json<Value>| async move {
                        *captured.lock().expect("capture lock") = body;
                        (
                            StatusCode::CREATED,
                            Json(json!({
                                "application_id": 41,
                                "status": "flagged",
                                "risk_score": 35.0,
                                "fraud_score": 0.82,
                                "fraud_detection": {
                                    "is_fraud": true,
                                    "fraud_score": 0.82,
                                    "risk_level": "high",
                                    "model_type": "isolation_forest"
                                }
                            })),
                        )
                    },
                )
                .get(|| async { Json(json!({ "applications": [summary_json(41, "Acme", "flagged")] })) }),
            )
            .route("/api/v1/analytics/dashboard", get(|| async { Json(dashboard_json()) }))
            .with_state(captured.clone()),
    )
    .await;
    let client = signed_in(&server, reviewer()).await;

    let mut application = NewApplication::default();
    application.profile.company_name = "Acme".into();
    application.profile.email = "ops@acme.test".into();
    application.security.mfa_enabled = true;
    application.legacy.credit_score = Some(710);

    let outcome = client
        .submit_application(&application)
        .await
        .expect("submit");

    assert_eq!(outcome.application_id, ApplicationId(41));
    assert_eq!(outcome.status, ApplicationStatus::Flagged);
    let verdict = outcome.risk.verdict.expect("verdict");
    assert!(verdict.is_fraud);
    assert_eq!(verdict.risk_level, RiskLevel::High);
    assert_eq!(outcome.risk.fraud_score_label().as_deref(), Some("82.0%"));

    let body = captured.lock().expect("capture lock").clone();
    assert_eq!(body["type"], "vendor");
    assert_eq!(body["company_name"], "Acme");
    assert_eq!(body["mfaEnabled"], true);
    assert_eq!(body["credit_score"], 710);
    assert_eq!(body["age"], 30);
    assert_eq!(body["num_devices"], 1);

    assert_eq!(client.last_dashboard().await.map(|s| s.total), Some(12));
}

#[tokio::test]
async fn export_uses_active_filter_and_search() {
    let server = spawn_server(
        Router::new()
            .route(
                "/api/v1/applications",
                get(|| async { Json(json!({ "applications": [] })) }),
            )
            .route(
                "/api/v1/applications/export/csv",
                get(|| async { "id,company_name\n1,Acme\n" }),
            ),
    )
    .await;
    let client = signed_in(&server, reviewer()).await;
    client
        .search(ListQuery::for_view(FilterView::Flagged).with_search("Acme"))
        .await
        .expect("search");
    let dir = unique_temp_dir("export");

    let path = client
        .export_csv(&DirectorySink::new(&dir))
        .await
        .expect("export");

    assert!(path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("applications_") && name.ends_with(".csv")));
    assert_eq!(
        std::fs::read_to_string(&path).expect("read"),
        "id,company_name\n1,Acme\n"
    );
    let export = server
        .recorder
        .matching("GET", "/api/v1/applications/export/csv");
    let query = export[0].query.clone().unwrap_or_default();
    assert!(query.contains("status=flagged"), "query was {query}");
    assert!(query.contains("search=Acme"), "query was {query}");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn bulk_import_is_admin_only() {
    let server = spawn_server(Router::new()).await;
    let client = signed_in(&server, reviewer()).await;

    let err = client.import_bulk().await.expect_err("reviewer");

    assert!(matches!(err, ClientError::NotPermitted(_)));
    assert!(server.recorder.all().is_empty());
}

#[tokio::test]
async fn bulk_import_refreshes_dashboard_and_resets_list() {
    let server = spawn_server(
        Router::new()
            .route(
                "/api/v1/import/kaggle-data",
                post(|| async {
                    Json(json!({
                        "imported": 90, "skipped": 10, "total": 100,
                        "status_breakdown": { "flagged": 20, "pending": 50, "approved": 20 }
                    }))
                }),
            )
            .route(
                "/api/v1/applications",
                get(|| async { Json(json!({ "applications": [] })) }),
            )
            .route("/api/v1/analytics/dashboard", get(|| async { Json(dashboard_json()) })),
    )
    .await;
    let client = signed_in(&server, admin()).await;
    client
        .search(ListQuery::for_view(FilterView::Flagged).with_search("Acme"))
        .await
        .expect("search");

    let summary = client.import_bulk().await.expect("import");

    assert_eq!(summary.imported, 90);
    assert_eq!(summary.skipped, 10);
    assert_eq!(
        summary.status_breakdown.map(|breakdown| breakdown.pending),
        Some(50)
    );
    assert_eq!(client.list().active_query().await, ListQuery::all());
    assert_eq!(server.recorder.count("GET", "/api/v1/analytics/dashboard"), 1);
    assert_eq!(server.recorder.count("GET", "/api/v1/applications"), 2);
}

#[tokio::test]
async fn dashboard_failure_is_not_surfaced() {
    let server = spawn_server(Router::new().route(
        "/api/v1/analytics/dashboard",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    assert!(client.dashboard().await.is_none());
    assert!(client.last_dashboard().await.is_none());
    assert!(client.session().is_authenticated().await);
}

#[tokio::test]
async fn logout_drops_loaded_views() {
    let server = spawn_server(
        Router::new()
            .route(
                "/api/v1/applications",
                get(|| async { Json(json!({ "applications": [summary_json(3, "Initech", "pending_review")] })) }),
            )
            .route("/api/v1/analytics/dashboard", get(|| async { Json(dashboard_json()) })),
    )
    .await;
    let client = signed_in(&server, reviewer()).await;
    client.select_view(FilterView::All).await.expect("list");
    client.dashboard().await.expect("dashboard");

    client.logout().await;

    assert!(!client.session().is_authenticated().await);
    assert!(!client.list().snapshot().await.results.is_loaded());
    assert!(client.last_dashboard().await.is_none());
    assert!(client.workflow().current().await.is_none());
}

#[test]
fn invalid_api_url_is_a_configuration_error() {
    let options = ClientOptions {
        api_url: "localhost:5001".into(),
        ..ClientOptions::default()
    };
    let result = OnboardingClient::new(options, Arc::new(MemoryCredentialStore::new()));
    assert!(matches!(result, Err(ClientError::Config(_))));
}
