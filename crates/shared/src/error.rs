use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::Validation,
            409 => ErrorCode::Conflict,
            500..=599 => ErrorCode::Internal,
            _ => ErrorCode::Conflict,
        }
    }
}

/// Error body shapes the API is known to return: `{"error": ...}` from the
/// application handlers, `{"msg": ...}` from the token layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error
            .or(self.msg)
            .or(self.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    /// False when `message` is a generic fallback rather than server text.
    pub from_server: bool,
}

impl ApiError {
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let code = ErrorCode::from_status(status);
        let server_message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message);

        match server_message {
            Some(message) => Self {
                code,
                status,
                message,
                from_server: true,
            },
            None => Self {
                code,
                status,
                message: format!("Request failed with status {status}"),
                from_server: false,
            },
        }
    }
}
