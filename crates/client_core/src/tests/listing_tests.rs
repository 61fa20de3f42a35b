use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use super::*;
use crate::test_support::{reviewer, signed_in, spawn_server, summary_json};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

#[test]
fn empty_search_is_omitted_and_text_is_sent_verbatim() {
    let wire = ListQuery::all().with_search("").to_wire(50);
    assert_eq!(wire.search, None);
    assert_eq!(wire.status, None);

    let wire = ListQuery::for_view(FilterView::Pending)
        .with_search("  Acme ")
        .to_wire(25);
    assert_eq!(wire.search.as_deref(), Some("  Acme "));
    assert_eq!(
        ListQuery::all().with_search("  Acme ").to_export().search.as_deref(),
        Some("  Acme ")
    );
    assert_eq!(wire.status, Some(ApplicationStatus::PendingReview));
    assert_eq!(wire.per_page, 25);
}

#[tokio::test]
async fn filtered_search_issues_one_request_and_empty_result_is_not_an_error() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications",
        get(|| async { Json(json!({ "applications": [], "total": 0 })) }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    let results = client
        .search(ListQuery::for_view(FilterView::Flagged).with_search("Acme"))
        .await
        .expect("search");

    assert!(results.is_empty());
    let requests = server.recorder.matching("GET", "/api/v1/applications");
    assert_eq!(requests.len(), 1);
    let query = requests[0].query.clone().unwrap_or_default();
    assert!(query.contains("status=flagged"), "query was {query}");
    assert!(query.contains("search=Acme"), "query was {query}");
    assert!(query.contains("per_page=50"), "query was {query}");

    let snapshot = client.list().snapshot().await;
    assert!(snapshot.is_empty_result());
    assert_eq!(snapshot.query.status, Some(ApplicationStatus::Flagged));
}

#[tokio::test]
async fn selecting_a_view_clears_the_search_text() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications",
        get(|| async { Json(json!({ "applications": [summary_json(1, "Acme", "pending_review")] })) }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    client
        .search(ListQuery::all().with_search("Acme"))
        .await
        .expect("search");
    client
        .select_view(FilterView::Pending)
        .await
        .expect("select");

    let active = client.list().active_query().await;
    assert_eq!(active, ListQuery::for_view(FilterView::Pending));
    let requests = server.recorder.matching("GET", "/api/v1/applications");
    let last = requests.last().and_then(|r| r.query.clone()).unwrap_or_default();
    assert!(last.contains("status=pending_review"), "query was {last}");
    assert!(!last.contains("search="), "query was {last}");
}

#[tokio::test]
async fn failed_refresh_keeps_previous_results() {
    let failing = Arc::new(AtomicBool::new(false));
    let server = spawn_server(
        Router::new()
            .route(
                "/api/v1/applications",
                get(|State(failing): State<Arc<AtomicBool>>| async move {
                    if failing.load(Ordering::SeqCst) {
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    } else {
                        Json(json!({ "applications": [summary_json(9, "Globex", "flagged")] }))
                            .into_response()
                    }
                }),
            )
            .with_state(failing.clone()),
    )
    .await;
    let client = signed_in(&server, reviewer()).await;

    client.search(ListQuery::all()).await.expect("first load");
    failing.store(true, Ordering::SeqCst);
    assert!(client.list().refresh().await.is_err());

    let snapshot = client.list().snapshot().await;
    assert_eq!(snapshot.results.as_loaded().map(Vec::len), Some(1));
    assert_eq!(
        snapshot.status_of(ApplicationId(9)),
        Some(ApplicationStatus::Flagged)
    );
}

#[tokio::test]
async fn reset_forgets_results() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications",
        get(|| async { Json(json!({ "applications": [summary_json(1, "Acme", "approved")] })) }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    client.search(ListQuery::all()).await.expect("load");
    client.list().reset().await;

    let snapshot = client.list().snapshot().await;
    assert!(!snapshot.results.is_loaded());
    assert!(!snapshot.is_empty_result());
}

#[tokio::test]
async fn slow_response_for_an_older_query_does_not_replace_newer_results() {
    let server = spawn_server(Router::new().route(
        "/api/v1/applications",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            if params.get("status").map(String::as_str) == Some("flagged") {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({ "applications": [summary_json(1, "Old", "flagged")] }))
            } else {
                Json(json!({ "applications": [summary_json(2, "New", "approved")] }))
            }
        }),
    ))
    .await;
    let client = signed_in(&server, reviewer()).await;

    let (flagged, approved) = tokio::join!(
        client.search(ListQuery::for_view(FilterView::Flagged)),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            client.search(ListQuery::for_view(FilterView::Approved)).await
        }
    );

    // Each caller still gets its own response.
    assert_eq!(flagged.expect("flagged")[0].company_name, "Old");
    assert_eq!(approved.expect("approved")[0].company_name, "New");

    let snapshot = client.list().snapshot().await;
    assert_eq!(snapshot.query.status, Some(ApplicationStatus::Approved));
    let names: Vec<String> = snapshot
        .results
        .as_loaded()
        .map(|applications| {
            applications
                .iter()
                .map(|application| application.company_name.clone())
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(names, vec!["New".to_string()]);
    assert_eq!(server.recorder.count("GET", "/api/v1/applications"), 2);
}
