//! Typed wrapper over the onboarding HTTP API.
//!
//! Every authenticated call reads the bearer credential from the
//! [`SessionManager`] at send time, so a logout is observed by the very next
//! request. Non-success responses are normalized here and nowhere else.

use std::sync::Arc;

use reqwest::{
    multipart::{Form, Part},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ApplicationId, DocumentId, DocumentType, UserId},
    error::ApiError,
    protocol::{
        AddCommentRequest, ApplicationDetail, ApplicationListQuery, ApplicationListResponse,
        ApplicationSummary, Comment, CommentListResponse, CreateApplicationRequest,
        CreateApplicationResponse, DashboardResponse, DashboardSummary, DocumentListResponse,
        DocumentRecord, DocumentUploadResponse, ExportQuery, ImportResponse, UpdateStatusRequest,
        UpdateUserRequest, UpdateUserResponse, UserListResponse, UserProfile,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    session::SessionManager,
};

const VERSIONED_PREFIX: &str = "/api/v1";

/// Resolved API locations: the versioned base every operation hangs off, and
/// the unversioned root used by the liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: String,
    root: String,
}

impl Endpoints {
    pub fn parse(api_url: &str) -> ClientResult<Self> {
        let mut url = Url::parse(api_url.trim())
            .map_err(|err| ClientError::Config(format!("api url '{api_url}': {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "api url '{api_url}' must use http or https"
            )));
        }
        url.set_query(None);
        url.set_fragment(None);

        let path = url.path().trim_end_matches('/').to_string();
        let root_path = path.strip_suffix(VERSIONED_PREFIX).unwrap_or(&path).to_string();

        url.set_path(&path);
        let api_base = url.as_str().trim_end_matches('/').to_string();
        url.set_path(&format!("{root_path}/"));
        let root = url.to_string();

        Ok(Self { api_base, root })
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn health(&self) -> &str {
        &self.root
    }
}

pub(crate) async fn read_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.bytes().await.unwrap_or_default();
    ApiError::from_response(status, &body).into()
}

pub(crate) async fn check(response: Response) -> ClientResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(read_error(response).await)
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| ClientError::Decode(err.to_string()))
}

pub struct ApiGateway {
    http: Client,
    endpoints: Endpoints,
    session: Arc<SessionManager>,
}

impl ApiGateway {
    pub fn new(http: Client, endpoints: Endpoints, session: Arc<SessionManager>) -> Self {
        Self {
            http,
            endpoints,
            session,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn authorized(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self
            .session
            .token()
            .await
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(self
            .http
            .request(method, self.endpoints.api(path))
            .bearer_auth(token))
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let err = read_error(response).await;
            warn!("api: credential rejected, ending session: {err}");
            self.session.invalidate().await;
            return Err(err);
        }

        check(response).await
    }

    pub async fn dashboard(&self) -> ClientResult<DashboardSummary> {
        let request = self.authorized(Method::GET, "/analytics/dashboard").await?;
        let body: DashboardResponse = decode(self.execute(request).await?).await?;
        Ok(body.summary)
    }

    pub async fn list_applications(
        &self,
        query: &ApplicationListQuery,
    ) -> ClientResult<Vec<ApplicationSummary>> {
        debug!(
            status = ?query.status,
            search = ?query.search,
            "api: listing applications"
        );
        let request = self
            .authorized(Method::GET, "/applications")
            .await?
            .query(query);
        let body: ApplicationListResponse = decode(self.execute(request).await?).await?;
        Ok(body.applications)
    }

    pub async fn application(&self, id: ApplicationId) -> ClientResult<ApplicationDetail> {
        let request = self
            .authorized(Method::GET, &format!("/applications/{id}"))
            .await?;
        decode(self.execute(request).await?).await
    }

    pub async fn create_application(
        &self,
        body: &CreateApplicationRequest,
    ) -> ClientResult<CreateApplicationResponse> {
        let request = self
            .authorized(Method::POST, "/applications")
            .await?
            .json(body);
        decode(self.execute(request).await?).await
    }

    pub async fn update_status(
        &self,
        id: ApplicationId,
        body: &UpdateStatusRequest,
    ) -> ClientResult<()> {
        let request = self
            .authorized(Method::PUT, &format!("/applications/{id}/status"))
            .await?
            .json(body);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn add_comment(&self, id: ApplicationId, text: &str) -> ClientResult<()> {
        let request = self
            .authorized(Method::POST, &format!("/applications/{id}/comments"))
            .await?
            .json(&AddCommentRequest {
                comment: text.to_string(),
            });
        self.execute(request).await?;
        Ok(())
    }

    pub async fn comments(&self, id: ApplicationId) -> ClientResult<Vec<Comment>> {
        let request = self
            .authorized(Method::GET, &format!("/applications/{id}/comments"))
            .await?;
        let body: CommentListResponse = decode(self.execute(request).await?).await?;
        Ok(body.comments)
    }

    pub async fn upload_document(
        &self,
        id: ApplicationId,
        filename: &str,
        bytes: Vec<u8>,
        file_type: DocumentType,
    ) -> ClientResult<DocumentRecord> {
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("file_type", file_type.as_str());
        let request = self
            .authorized(Method::POST, &format!("/applications/{id}/documents"))
            .await?
            .multipart(form);
        let body: DocumentUploadResponse = decode(self.execute(request).await?).await?;
        Ok(body.document)
    }

    pub async fn documents(&self, id: ApplicationId) -> ClientResult<Vec<DocumentRecord>> {
        let request = self
            .authorized(Method::GET, &format!("/applications/{id}/documents"))
            .await?;
        let body: DocumentListResponse = decode(self.execute(request).await?).await?;
        Ok(body.documents)
    }

    pub async fn download_document(&self, id: DocumentId) -> ClientResult<Vec<u8>> {
        let request = self
            .authorized(Method::GET, &format!("/documents/{id}/download"))
            .await?;
        let bytes = self
            .execute(request)
            .await?
            .bytes()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    pub async fn delete_document(&self, id: DocumentId) -> ClientResult<()> {
        let request = self
            .authorized(Method::DELETE, &format!("/documents/{id}"))
            .await?;
        self.execute(request).await?;
        Ok(())
    }

    pub async fn users(&self) -> ClientResult<Vec<UserProfile>> {
        let request = self.authorized(Method::GET, "/users").await?;
        let body: UserListResponse = decode(self.execute(request).await?).await?;
        Ok(body.users)
    }

    pub async fn update_user(
        &self,
        id: UserId,
        body: &UpdateUserRequest,
    ) -> ClientResult<UserProfile> {
        let request = self
            .authorized(Method::PUT, &format!("/users/{id}"))
            .await?
            .json(body);
        let body: UpdateUserResponse = decode(self.execute(request).await?).await?;
        Ok(body.user)
    }

    pub async fn delete_user(&self, id: UserId) -> ClientResult<()> {
        let request = self
            .authorized(Method::DELETE, &format!("/users/{id}"))
            .await?;
        self.execute(request).await?;
        Ok(())
    }

    pub async fn export_csv(&self, query: &ExportQuery) -> ClientResult<Vec<u8>> {
        let request = self
            .authorized(Method::GET, "/applications/export/csv")
            .await?
            .query(query);
        let bytes = self
            .execute(request)
            .await?
            .bytes()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    pub async fn import_bulk(&self) -> ClientResult<ImportResponse> {
        let request = self.authorized(Method::POST, "/import/kaggle-data").await?;
        decode(self.execute(request).await?).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
