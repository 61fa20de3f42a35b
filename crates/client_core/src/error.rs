use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Failures detected locally, before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Comment cannot be empty")]
    EmptyComment,
    #[error("Please select a file")]
    MissingFile,
    #[error("File too large ({size} bytes). Maximum size: 10MB")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("{0} is required")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("not permitted: {0}")]
    NotPermitted(String),
    #[error("{message}")]
    Conflict { message: String, from_server: bool },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("local storage error: {0}")]
    Storage(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        match value.code {
            ErrorCode::Unauthorized => ClientError::Auth(value.message),
            ErrorCode::Forbidden => ClientError::NotPermitted(value.message),
            ErrorCode::NotFound => ClientError::NotFound(value.message),
            ErrorCode::Validation | ErrorCode::Conflict | ErrorCode::Internal => {
                ClientError::Conflict {
                    message: value.message,
                    from_server: value.from_server,
                }
            }
        }
    }
}

impl ClientError {
    /// Text suitable for a dismissible user-facing message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(err) => err.to_string(),
            ClientError::Auth(message) => message.clone(),
            ClientError::NotAuthenticated => "Please sign in to continue".to_string(),
            ClientError::NotPermitted(message) => message.clone(),
            ClientError::Conflict {
                message,
                from_server: true,
            } => message.clone(),
            ClientError::Conflict {
                from_server: false, ..
            } => "The request could not be completed".to_string(),
            ClientError::NotFound(message) => message.clone(),
            ClientError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ClientError::Decode(_) => "Unexpected response from server".to_string(),
            ClientError::Storage(message) => format!("Local storage failure: {message}"),
            ClientError::Config(message) => format!("Configuration problem: {message}"),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, ClientError::Auth(_) | ClientError::NotAuthenticated)
    }
}
