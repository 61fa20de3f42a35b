use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex},
};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{
    domain::Role,
    protocol::{AuthResponse, LoginRequest, RegisterRequest, UserProfile},
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    error::{ClientError, ClientResult, ValidationError, NETWORK_ERROR_MESSAGE},
    gateway::{check, decode, Endpoints},
};

/// The record kept under the single durable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Authenticated identity plus the opaque bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }
}

impl From<StoredCredential> for Session {
    fn from(value: StoredCredential) -> Self {
        Self {
            token: value.access_token,
            user: value.user,
        }
    }
}

impl From<&Session> for StoredCredential {
    fn from(value: &Session) -> Self {
        Self {
            access_token: value.token.clone(),
            user: value.user.clone(),
        }
    }
}

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<StoredCredential>>;
    fn save(&self, credential: &StoredCredential) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// JSON file holding the credential, surviving process restarts.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> ClientResult<Option<StoredCredential>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ClientError::Storage(format!(
                    "failed to read '{}': {err}",
                    self.path.display()
                )))
            }
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw).map(Some).map_err(|err| {
            ClientError::Storage(format!(
                "corrupt credential file '{}': {err}",
                self.path.display()
            ))
        })
    }

    fn save(&self, credential: &StoredCredential) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ClientError::Storage(format!(
                    "failed to create '{}': {err}",
                    parent.display()
                ))
            })?;
        }
        let serialized = serde_json::to_string_pretty(credential)
            .map_err(|err| ClientError::Storage(err.to_string()))?;
        fs::write(&self.path, serialized).map_err(|err| {
            ClientError::Storage(format!("failed to write '{}': {err}", self.path.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600));
        }
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::Storage(format!(
                "failed to remove '{}': {err}",
                self.path.display()
            ))),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: StdMutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: StoredCredential) -> Self {
        Self {
            slot: StdMutex::new(Some(credential)),
        }
    }

    fn lock(&self) -> ClientResult<std::sync::MutexGuard<'_, Option<StoredCredential>>> {
        self.slot
            .lock()
            .map_err(|_| ClientError::Storage("credential slot poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> ClientResult<Option<StoredCredential>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, credential: &StoredCredential) -> ClientResult<()> {
        *self.lock()? = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Owns the process-wide session. Other components hold an `Arc` to it and
/// read the credential per request; nothing caches the token elsewhere.
pub struct SessionManager {
    http: Client,
    endpoints: Endpoints,
    store: Arc<dyn CredentialStore>,
    current: RwLock<Option<Session>>,
}

fn into_auth_error(err: ClientError) -> ClientError {
    match err {
        ClientError::Validation(_) | ClientError::Auth(_) => err,
        ClientError::Network(detail) => {
            warn!("auth: request failed before reaching the server: {detail}");
            ClientError::Auth(NETWORK_ERROR_MESSAGE.to_string())
        }
        other => ClientError::Auth(other.user_message()),
    }
}

impl SessionManager {
    pub fn new(http: Client, endpoints: Endpoints, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            http,
            endpoints,
            store,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.current
            .read()
            .await
            .as_ref()
            .and_then(|session| session.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Session> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let auth = self
            .authenticate("/auth/login", &body)
            .await
            .map_err(into_auth_error)?;
        info!(user = %auth.user.username, role = %auth.user.role, "auth: signed in");
        Ok(self.establish(auth).await)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> ClientResult<Session> {
        if password != confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = self
            .authenticate("/auth/register", &body)
            .await
            .map_err(into_auth_error)?;
        info!(user = %auth.user.username, "auth: registered");
        Ok(self.establish(auth).await)
    }

    /// Soft validation: a stored credential is trusted unless the health check gets
    /// an explicit 401. An unreachable server keeps the session.
    pub async fn restore(&self) -> Option<Session> {
        let stored = match self.store.load() {
            Ok(stored) => stored?,
            Err(err) => {
                warn!("auth: could not read stored credential: {err}");
                return None;
            }
        };
        let session = Session::from(stored);

        match self
            .http
            .get(self.endpoints.health())
            .bearer_auth(&session.token)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                warn!("auth: stored credential rejected by liveness check");
                self.discard_stored();
                return None;
            }
            Ok(response) => {
                if !response.status().is_success() {
                    warn!(
                        status = response.status().as_u16(),
                        "auth: liveness check returned non-success; keeping session"
                    );
                }
            }
            Err(err) => {
                warn!("auth: liveness check unreachable, keeping session: {err}");
            }
        }

        *self.current.write().await = Some(session.clone());
        Some(session)
    }

    pub async fn logout(&self) {
        *self.current.write().await = None;
        self.discard_stored();
        info!("auth: signed out");
    }

    /// Called when an authenticated request is answered with 401.
    pub(crate) async fn invalidate(&self) {
        let had_session = self.current.write().await.take().is_some();
        if had_session {
            self.discard_stored();
        }
    }

    #[cfg(test)]
    pub(crate) async fn install(&self, session: Session) {
        *self.current.write().await = Some(session);
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<AuthResponse> {
        let response = self
            .http
            .post(self.endpoints.api(path))
            .json(body)
            .send()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;
        decode(check(response).await?).await
    }

    async fn establish(&self, auth: AuthResponse) -> Session {
        let session = Session {
            token: auth.access_token,
            user: Some(auth.user),
        };
        if let Err(err) = self.store.save(&StoredCredential::from(&session)) {
            warn!("auth: session will not survive restart: {err}");
        }
        *self.current.write().await = Some(session.clone());
        session
    }

    fn discard_stored(&self) {
        if let Err(err) = self.store.clear() {
            warn!("auth: failed to clear stored credential: {err}");
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
