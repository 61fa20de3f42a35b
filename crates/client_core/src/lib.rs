use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::{Local, NaiveDate};
use reqwest::Client;
use shared::{
    domain::{ApplicationId, ApplicationStatus, FilterView},
    protocol::{
        ApplicationSummary, CreateApplicationRequest, DashboardSummary, ImportResponse,
        NewApplication, StatusBreakdown,
    },
};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub mod admin;
pub mod error;
pub mod gateway;
pub mod interaction;
pub mod listing;
pub mod loadable;
pub mod risk;
pub mod session;
pub mod workflow;

pub use admin::{UserAdministration, UserRow};
pub use error::{ClientError, ClientResult, ValidationError};
pub use gateway::{ApiGateway, Endpoints};
pub use interaction::{Confirm, DeleteOutcome, DirectorySink, DownloadSink, Preconfirmed};
pub use listing::{ApplicationListView, ListQuery, ListSnapshot};
pub use loadable::Loadable;
pub use risk::{FraudSeverity, RiskPresentation, RiskVerdict};
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, SessionManager,
    StoredCredential,
};
pub use workflow::{
    review_actions, ApplicationView, DocumentUpload, WorkflowController, WorkflowEvent,
    MAX_UPLOAD_BYTES,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_url: String,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub risk: RiskPresentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: u64,
    pub total: u64,
    pub status_breakdown: Option<StatusBreakdown>,
}

impl From<ImportResponse> for ImportSummary {
    fn from(value: ImportResponse) -> Self {
        Self {
            imported: value.imported,
            skipped: value.skipped,
            total: value.total,
            status_breakdown: value.status_breakdown,
        }
    }
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("applications_{}.csv", date.format("%Y-%m-%d"))
}

/// Wires the components around one session and one HTTP client.
pub struct OnboardingClient {
    session: Arc<SessionManager>,
    api: Arc<ApiGateway>,
    list: Arc<ApplicationListView>,
    workflow: WorkflowController,
    admin: UserAdministration,
    dashboard: Mutex<Option<DashboardSummary>>,
}

impl OnboardingClient {
    pub fn new(options: ClientOptions, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        let endpoints = Endpoints::parse(&options.api_url)?;
        let http = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|err| ClientError::Config(format!("http client: {err}")))?;

        let session = Arc::new(SessionManager::new(http.clone(), endpoints.clone(), store));
        let api = Arc::new(ApiGateway::new(http, endpoints, Arc::clone(&session)));
        let list = Arc::new(ApplicationListView::new(Arc::clone(&api), options.page_size));
        let workflow =
            WorkflowController::new(Arc::clone(&api), Arc::clone(&session), Arc::clone(&list));
        let admin = UserAdministration::new(Arc::clone(&api), Arc::clone(&session));

        Ok(Self {
            session,
            api,
            list,
            workflow,
            admin,
            dashboard: Mutex::new(None),
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn endpoints(&self) -> &Endpoints {
        self.api.endpoints()
    }

    pub fn list(&self) -> &ApplicationListView {
        &self.list
    }

    pub fn workflow(&self) -> &WorkflowController {
        &self.workflow
    }

    pub fn admin(&self) -> &UserAdministration {
        &self.admin
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Session> {
        self.session.login(username, password).await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> ClientResult<Session> {
        self.session
            .register(username, email, password, confirm_password)
            .await
    }

    pub async fn restore(&self) -> Option<Session> {
        self.session.restore().await
    }

    /// Ends the session and drops every view that was loaded under it.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.workflow.reset().await;
        self.list.reset().await;
        self.admin.reset().await;
        *self.dashboard.lock().await = None;
    }

    /// Switching views clears the search text and closes the open detail.
    pub async fn select_view(&self, view: FilterView) -> ClientResult<Vec<ApplicationSummary>> {
        self.workflow.close().await;
        self.list.select_view(view).await
    }

    pub async fn search(&self, query: ListQuery) -> ClientResult<Vec<ApplicationSummary>> {
        self.list.search(query).await
    }

    /// Best-effort: failures are logged and yield `None`.
    pub async fn dashboard(&self) -> Option<DashboardSummary> {
        match self.api.dashboard().await {
            Ok(summary) => {
                *self.dashboard.lock().await = Some(summary);
                Some(summary)
            }
            Err(err) => {
                warn!("dashboard: refresh failed: {err}");
                None
            }
        }
    }

    pub async fn last_dashboard(&self) -> Option<DashboardSummary> {
        *self.dashboard.lock().await
    }

    pub async fn submit_application(
        &self,
        application: &NewApplication,
    ) -> ClientResult<SubmissionOutcome> {
        if application.profile.company_name.trim().is_empty() {
            return Err(ValidationError::MissingField("Company name").into());
        }
        if application.profile.email.trim().is_empty() {
            return Err(ValidationError::MissingField("Email").into());
        }

        let request = CreateApplicationRequest::vendor(application);
        let response = self.api.create_application(&request).await?;
        let outcome = SubmissionOutcome {
            application_id: response.application_id,
            status: response.status,
            risk: RiskPresentation::from_submission(&response),
        };
        info!(
            application_id = %outcome.application_id,
            status = %outcome.status,
            "submission: application created"
        );

        self.dashboard().await;
        if let Err(err) = self.list.refresh().await {
            warn!("submission: list refresh failed: {err}");
        }
        Ok(outcome)
    }

    /// Exports the applications matching the active filter and search.
    pub async fn export_csv(&self, sink: &dyn DownloadSink) -> ClientResult<PathBuf> {
        let query = self.list.active_query().await.to_export();
        let bytes = self.api.export_csv(&query).await?;
        let filename = export_filename(Local::now().date_naive());
        let path = sink.save(&filename, &bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "export: csv saved");
        Ok(path)
    }

    pub async fn import_bulk(&self) -> ClientResult<ImportSummary> {
        let user = self
            .session
            .current()
            .await
            .ok_or(ClientError::NotAuthenticated)?;
        if !user.role().is_some_and(|role| role.is_admin()) {
            return Err(ClientError::NotPermitted(
                "bulk import requires the admin role".to_string(),
            ));
        }

        let summary = ImportSummary::from(self.api.import_bulk().await?);
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            total = summary.total,
            "import: completed"
        );

        self.dashboard().await;
        if let Err(err) = self.select_view(FilterView::All).await {
            warn!("import: list refresh failed: {err}");
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
