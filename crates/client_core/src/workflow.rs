//! Review workflow for the application currently open in the detail view.
//!
//! Every successful mutation is followed by a re-fetch of the affected views;
//! nothing is patched locally. Failed mutations leave the displayed state as
//! it was and are published as [`WorkflowEvent::Error`].

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use shared::{
    domain::{ApplicationId, ApplicationStatus, DocumentId, DocumentType, ReviewDecision, Role},
    protocol::{ApplicationDetail, Comment, DocumentRecord, UpdateStatusRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ClientResult, ValidationError},
    gateway::ApiGateway,
    interaction::{Confirm, DeleteOutcome, DownloadSink},
    listing::ApplicationListView,
    loadable::Loadable,
    risk::RiskPresentation,
    session::SessionManager,
};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DELETE_DOCUMENT_PROMPT: &str = "Are you sure you want to delete this document?";

const REVIEW_ACTIONS: &[ReviewDecision] = &[ReviewDecision::Approve, ReviewDecision::Flag];

/// Transitions offered to `role` for an application in `status`. Approved
/// applications and non-reviewer roles get none.
pub fn review_actions(role: Option<Role>, status: ApplicationStatus) -> &'static [ReviewDecision] {
    match role {
        Some(role) if role.can_review() && !status.is_terminal() => REVIEW_ACTIONS,
        _ => &[],
    }
}

pub fn check_upload_size(size: u64) -> Result<(), ValidationError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Reads a file for upload, rejecting oversized files from their metadata
    /// before reading any content.
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let metadata = tokio::fs::metadata(path).await.map_err(|err| {
            ClientError::Storage(format!("failed to stat '{}': {err}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(ValidationError::MissingFile.into());
        }
        check_upload_size(metadata.len())?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ValidationError::MissingFile)?;
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            ClientError::Storage(format!("failed to read '{}': {err}", path.display()))
        })?;
        Ok(Self::new(filename, bytes))
    }
}

/// One application as displayed, with its dependent collections tracked
/// separately so a missing collection reads as "not loaded".
#[derive(Debug, Clone)]
pub struct ApplicationView {
    pub application: ApplicationDetail,
    pub comments: Loadable<Vec<Comment>>,
    pub documents: Loadable<Vec<DocumentRecord>>,
    pub risk: RiskPresentation,
}

fn oldest_first(mut comments: Vec<Comment>) -> Vec<Comment> {
    comments.sort_by_key(|comment| comment.created_at);
    comments
}

impl ApplicationView {
    pub fn from_detail(mut detail: ApplicationDetail) -> Self {
        let comments = detail.comments.take().map(oldest_first).into();
        let documents = detail.documents.take().into();
        let risk = RiskPresentation::from_detail(&detail);
        Self {
            application: detail,
            comments,
            documents,
            risk,
        }
    }

    pub fn id(&self) -> ApplicationId {
        self.application.id
    }

    pub fn status(&self) -> ApplicationStatus {
        self.application.status
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    ListRefreshed {
        count: usize,
    },
    DetailRefreshed {
        application_id: ApplicationId,
    },
    StatusChanged {
        application_id: ApplicationId,
        status: ApplicationStatus,
    },
    CommentsRefreshed {
        application_id: ApplicationId,
        count: usize,
    },
    DocumentsRefreshed {
        application_id: ApplicationId,
        count: usize,
    },
    Notice(String),
    Error(String),
}

#[derive(Default)]
struct DetailState {
    selected: Option<ApplicationId>,
    generation: u64,
    view: Option<ApplicationView>,
}

pub struct WorkflowController {
    api: Arc<ApiGateway>,
    session: Arc<SessionManager>,
    list: Arc<ApplicationListView>,
    state: Mutex<DetailState>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl WorkflowController {
    pub fn new(
        api: Arc<ApiGateway>,
        session: Arc<SessionManager>,
        list: Arc<ApplicationListView>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            session,
            list,
            state: Mutex::new(DetailState::default()),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: WorkflowEvent) {
        let _ = self.events.send(event);
    }

    fn surface<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(err) = &result {
            warn!("workflow: {err}");
            self.emit(WorkflowEvent::Error(err.user_message()));
        }
        result
    }

    pub async fn current(&self) -> Option<ApplicationView> {
        self.state.lock().await.view.clone()
    }

    pub async fn selected(&self) -> Option<ApplicationId> {
        self.state.lock().await.selected
    }

    /// Opens `id` in the detail view. Only the latest selection is ever
    /// displayed; a slower response for an earlier selection is discarded.
    pub async fn open(&self, id: ApplicationId) -> ClientResult<ApplicationView> {
        let generation = {
            let mut guard = self.state.lock().await;
            guard.selected = Some(id);
            guard.generation += 1;
            if guard.view.as_ref().map(ApplicationView::id) != Some(id) {
                guard.view = None;
            }
            guard.generation
        };

        let view = self.fetch_view(id, false).await?;
        self.apply_view(generation, view.clone()).await;
        Ok(view)
    }

    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        guard.selected = None;
        guard.view = None;
        guard.generation += 1;
    }

    pub async fn reset(&self) {
        self.close().await;
    }

    pub async fn available_actions(&self) -> Vec<ReviewDecision> {
        let Some(status) = self.current().await.map(|view| view.status()) else {
            return Vec::new();
        };
        let role = self.session.current().await.and_then(|s| s.role());
        review_actions(role, status).to_vec()
    }

    pub async fn set_status(
        &self,
        id: ApplicationId,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> ClientResult<ApplicationStatus> {
        let result = self.set_status_inner(id, decision, comment).await;
        self.surface(result)
    }

    async fn set_status_inner(
        &self,
        id: ApplicationId,
        decision: ReviewDecision,
        comment: Option<&str>,
    ) -> ClientResult<ApplicationStatus> {
        let session = self
            .session
            .current()
            .await
            .ok_or(ClientError::NotAuthenticated)?;
        if !session.role().is_some_and(Role::can_review) {
            return Err(ClientError::NotPermitted(
                "only reviewers and admins can change application status".to_string(),
            ));
        }
        if self
            .known_status(id)
            .await
            .is_some_and(ApplicationStatus::is_terminal)
        {
            return Err(ClientError::NotPermitted(format!(
                "application {id} is already approved"
            )));
        }

        let status = decision.target_status();
        let comment = comment
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
            .map(str::to_string);
        self.api
            .update_status(id, &UpdateStatusRequest { status, comment })
            .await?;

        info!(application_id = %id, status = %status, "workflow: status updated");
        self.emit(WorkflowEvent::StatusChanged {
            application_id: id,
            status,
        });
        self.emit(WorkflowEvent::Notice(format!(
            "Application {status} successfully!"
        )));

        self.refresh_list().await;
        self.reload_detail(id, false).await;
        Ok(status)
    }

    pub async fn add_comment(&self, id: ApplicationId, text: &str) -> ClientResult<()> {
        let result = self.add_comment_inner(id, text).await;
        self.surface(result)
    }

    async fn add_comment_inner(&self, id: ApplicationId, text: &str) -> ClientResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }
        self.api.add_comment(id, text).await?;
        info!(application_id = %id, "workflow: comment added");
        self.emit(WorkflowEvent::Notice("Comment added successfully!".to_string()));
        self.refresh_comments(id).await;
        Ok(())
    }

    pub async fn upload_document(
        &self,
        id: ApplicationId,
        upload: Option<DocumentUpload>,
        file_type: DocumentType,
    ) -> ClientResult<DocumentRecord> {
        let result = self.upload_document_inner(id, upload, file_type).await;
        self.surface(result)
    }

    async fn upload_document_inner(
        &self,
        id: ApplicationId,
        upload: Option<DocumentUpload>,
        file_type: DocumentType,
    ) -> ClientResult<DocumentRecord> {
        let upload = upload.ok_or(ValidationError::MissingFile)?;
        check_upload_size(upload.size())?;

        let size = upload.size();
        let record = self
            .api
            .upload_document(id, &upload.filename, upload.bytes, file_type)
            .await?;
        info!(
            application_id = %id,
            document_id = %record.id,
            size,
            "workflow: document uploaded"
        );
        self.emit(WorkflowEvent::Notice(
            "Document uploaded successfully!".to_string(),
        ));
        self.reload_detail(id, true).await;
        Ok(record)
    }

    pub async fn delete_document(
        &self,
        document_id: DocumentId,
        application_id: ApplicationId,
        confirm: &dyn Confirm,
    ) -> ClientResult<DeleteOutcome> {
        if !confirm.confirm(DELETE_DOCUMENT_PROMPT) {
            debug!(document_id = %document_id, "workflow: document deletion cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        let result = self.api.delete_document(document_id).await;
        self.surface(result)?;

        info!(document_id = %document_id, application_id = %application_id, "workflow: document deleted");
        self.emit(WorkflowEvent::Notice(
            "Document deleted successfully!".to_string(),
        ));
        self.reload_detail(application_id, true).await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Not retried on failure.
    pub async fn download_document(
        &self,
        document_id: DocumentId,
        filename: &str,
        sink: &dyn DownloadSink,
    ) -> ClientResult<PathBuf> {
        let result = self.download_inner(document_id, filename, sink).await;
        let path = self.surface(result)?;
        self.emit(WorkflowEvent::Notice("Document downloaded!".to_string()));
        Ok(path)
    }

    async fn download_inner(
        &self,
        document_id: DocumentId,
        filename: &str,
        sink: &dyn DownloadSink,
    ) -> ClientResult<PathBuf> {
        let bytes = self.api.download_document(document_id).await?;
        sink.save(filename, &bytes).await
    }

    /// Loads the document collection of the open application.
    pub async fn refresh_documents(&self, id: ApplicationId) -> ClientResult<Vec<DocumentRecord>> {
        let documents = self.api.documents(id).await?;
        let mut guard = self.state.lock().await;
        if let Some(view) = guard.view.as_mut().filter(|view| view.id() == id) {
            view.documents = Loadable::Loaded(documents.clone());
            self.emit(WorkflowEvent::DocumentsRefreshed {
                application_id: id,
                count: documents.len(),
            });
        }
        Ok(documents)
    }

    async fn refresh_comments(&self, id: ApplicationId) {
        let comments = match self.api.comments(id).await {
            Ok(comments) => oldest_first(comments),
            Err(err) => {
                warn!(application_id = %id, "workflow: comment refresh failed: {err}");
                return;
            }
        };
        let mut guard = self.state.lock().await;
        if let Some(view) = guard.view.as_mut().filter(|view| view.id() == id) {
            let count = comments.len();
            view.comments = Loadable::Loaded(comments);
            self.emit(WorkflowEvent::CommentsRefreshed {
                application_id: id,
                count,
            });
        }
    }

    async fn known_status(&self, id: ApplicationId) -> Option<ApplicationStatus> {
        let from_detail = self
            .current()
            .await
            .filter(|view| view.id() == id)
            .map(|view| view.status());
        match from_detail {
            Some(status) => Some(status),
            None => self.list.snapshot().await.status_of(id),
        }
    }

    async fn refresh_list(&self) {
        match self.list.refresh().await {
            Ok(applications) => self.emit(WorkflowEvent::ListRefreshed {
                count: applications.len(),
            }),
            Err(err) => warn!("workflow: list refresh failed: {err}"),
        }
    }

    /// Re-fetches the full detail if `id` is still the open application.
    async fn reload_detail(&self, id: ApplicationId, force_documents: bool) {
        let generation = {
            let mut guard = self.state.lock().await;
            if guard.selected != Some(id) {
                return;
            }
            guard.generation += 1;
            guard.generation
        };

        match self.fetch_view(id, force_documents).await {
            Ok(view) => {
                self.apply_view(generation, view).await;
            }
            Err(err) => warn!(application_id = %id, "workflow: detail refresh failed: {err}"),
        }
    }

    async fn fetch_view(
        &self,
        id: ApplicationId,
        force_documents: bool,
    ) -> ClientResult<ApplicationView> {
        let detail = self.api.application(id).await?;
        let mut view = ApplicationView::from_detail(detail);
        if force_documents || !view.documents.is_loaded() {
            match self.api.documents(id).await {
                Ok(documents) => view.documents = Loadable::Loaded(documents),
                Err(err) => {
                    warn!(application_id = %id, "workflow: document list unavailable: {err}")
                }
            }
        }
        Ok(view)
    }

    async fn apply_view(&self, generation: u64, view: ApplicationView) -> bool {
        let mut guard = self.state.lock().await;
        let id = view.id();
        if guard.generation != generation || guard.selected != Some(id) {
            debug!(
                application_id = %id,
                generation,
                latest = guard.generation,
                "workflow: dropping stale detail response"
            );
            return false;
        }
        guard.view = Some(view);
        self.emit(WorkflowEvent::DetailRefreshed { application_id: id });
        true
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
