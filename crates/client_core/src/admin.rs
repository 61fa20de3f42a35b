//! User administration. Admin-only, with the signed-in account protected
//! from changing its own role or deleting itself.

use std::sync::Arc;

use shared::{
    domain::{Role, UserId},
    protocol::{UpdateUserRequest, UserProfile},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ClientResult},
    gateway::ApiGateway,
    interaction::{Confirm, DeleteOutcome},
    loadable::Loadable,
    session::SessionManager,
};

const DELETE_USER_PROMPT: &str = "Are you sure you want to delete this user?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user: UserProfile,
    pub is_self: bool,
}

impl UserRow {
    pub fn can_delete(&self) -> bool {
        !self.is_self
    }

    pub fn can_change_role(&self) -> bool {
        !self.is_self
    }
}

pub struct UserAdministration {
    api: Arc<ApiGateway>,
    session: Arc<SessionManager>,
    rows: Mutex<Loadable<Vec<UserRow>>>,
}

impl UserAdministration {
    pub fn new(api: Arc<ApiGateway>, session: Arc<SessionManager>) -> Self {
        Self {
            api,
            session,
            rows: Mutex::new(Loadable::NotLoaded),
        }
    }

    pub async fn rows(&self) -> Loadable<Vec<UserRow>> {
        self.rows.lock().await.clone()
    }

    pub async fn reset(&self) {
        *self.rows.lock().await = Loadable::NotLoaded;
    }

    async fn require_admin(&self) -> ClientResult<UserProfile> {
        if !self.session.is_authenticated().await {
            return Err(ClientError::NotAuthenticated);
        }
        match self.session.user().await {
            Some(user) if user.role.is_admin() => Ok(user),
            _ => Err(ClientError::NotPermitted(
                "user administration requires the admin role".to_string(),
            )),
        }
    }

    pub async fn list_users(&self) -> ClientResult<Vec<UserRow>> {
        let me = self.require_admin().await?;
        self.load(me.id).await
    }

    async fn load(&self, me: UserId) -> ClientResult<Vec<UserRow>> {
        let rows: Vec<UserRow> = self
            .api
            .users()
            .await?
            .into_iter()
            .map(|user| UserRow {
                is_self: user.id == me,
                user,
            })
            .collect();
        debug!(count = rows.len(), "admin: users loaded");
        *self.rows.lock().await = Loadable::Loaded(rows.clone());
        Ok(rows)
    }

    async fn reload(&self, me: UserId) {
        if let Err(err) = self.load(me).await {
            warn!("admin: user list refresh failed: {err}");
        }
    }

    pub async fn update_user_role(&self, id: UserId, role: Role) -> ClientResult<UserProfile> {
        let me = self.require_admin().await?;
        if id == me.id {
            return Err(ClientError::NotPermitted(
                "you cannot change your own role".to_string(),
            ));
        }

        let request = UpdateUserRequest {
            role: Some(role),
            email: None,
        };
        let updated = self.api.update_user(id, &request).await?;
        info!(user_id = %id, role = %role, "admin: role updated");
        self.reload(me.id).await;
        Ok(updated)
    }

    pub async fn delete_user(&self, id: UserId, confirm: &dyn Confirm) -> ClientResult<DeleteOutcome> {
        let me = self.require_admin().await?;
        if id == me.id {
            return Err(ClientError::NotPermitted(
                "you cannot delete your own account".to_string(),
            ));
        }
        if !confirm.confirm(DELETE_USER_PROMPT) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.api.delete_user(id).await?;
        info!(user_id = %id, "admin: user deleted");
        self.reload(me.id).await;
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
