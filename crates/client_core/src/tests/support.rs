use std::sync::{Arc, Mutex as StdMutex};

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{Role, UserId},
    protocol::UserProfile,
};
use tokio::net::TcpListener;

use crate::{ClientOptions, CredentialStore, MemoryCredentialStore, OnboardingClient, Session};

pub(crate) const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone, Default)]
pub(crate) struct Recorder {
    requests: Arc<StdMutex<Vec<RecordedRequest>>>,
}

impl Recorder {
    pub fn all(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("recorder lock").clone()
    }

    pub fn matching(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.all()
            .into_iter()
            .filter(|request| request.method == method && request.path == path)
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.matching(method, path).len()
    }
}

async fn record(State(recorder): State<Recorder>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: request
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    recorder
        .requests
        .lock()
        .expect("recorder lock")
        .push(recorded);
    next.run(request).await
}

pub(crate) struct MockServer {
    pub root_url: String,
    pub recorder: Recorder,
}

impl MockServer {
    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.root_url)
    }
}

pub(crate) async fn spawn_server(routes: Router) -> MockServer {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let recorder = Recorder::default();
    let app = routes
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn_with_state(recorder.clone(), record));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockServer {
        root_url: format!("http://{addr}"),
        recorder,
    }
}

/// An address nothing listens on.
pub(crate) async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/api/v1")
}

pub(crate) fn client_for(api_url: &str, store: Arc<dyn CredentialStore>) -> OnboardingClient {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let options = ClientOptions {
        api_url: api_url.to_string(),
        ..ClientOptions::default()
    };
    OnboardingClient::new(options, store).expect("client")
}

pub(crate) fn anonymous_client(server: &MockServer) -> OnboardingClient {
    client_for(&server.api_url(), Arc::new(MemoryCredentialStore::new()))
}

pub(crate) async fn signed_in(server: &MockServer, user: UserProfile) -> OnboardingClient {
    let client = anonymous_client(server);
    client
        .session()
        .install(Session {
            token: TEST_TOKEN.to_string(),
            user: Some(user),
        })
        .await;
    client
}

pub(crate) fn profile(id: i64, username: &str, role: Role) -> UserProfile {
    UserProfile {
        id: UserId(id),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role,
    }
}

pub(crate) fn admin() -> UserProfile {
    profile(1, "admin", Role::Admin)
}

pub(crate) fn reviewer() -> UserProfile {
    profile(2, "reviewer", Role::Reviewer)
}

pub(crate) fn applicant() -> UserProfile {
    profile(3, "applicant", Role::User)
}

pub(crate) fn summary_json(id: i64, company_name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "type": "vendor",
        "company_name": company_name,
        "email": "ops@example.com",
        "status": status,
        "risk_score": 72.5,
        "fraud_score": 0.12,
        "submitted_date": "2024-03-01T10:00:00"
    })
}

/// Detail payload without comment or document collections.
pub(crate) fn detail_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "type": "vendor",
        "company_name": format!("Company {id}"),
        "email": "ops@example.com",
        "status": status,
        "risk_score": 72.5,
        "fraud_score": 0.12,
        "submitted_date": "2024-03-01T10:00:00",
        "audit_logs": []
    })
}

pub(crate) fn document_json(id: i64, filename: &str) -> Value {
    json!({
        "id": id,
        "filename": filename,
        "file_type": "certificate",
        "file_size": 1024,
        "uploaded_by": "reviewer",
        "uploaded_at": "2024-03-02T09:30:00"
    })
}

pub(crate) fn unique_temp_dir(label: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("onboarding-review-{label}-{nanos}"))
}
