//! Error taxonomy shared by the store, the ranking engine and the HTTP surface.
//!
//! Every variant maps to one HTTP status. Responses always carry a single
//! `{"error": message}` body; internal failures expose only their top-level message.

use axum::http::StatusCode;
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Memory not found")]
    NotFound,

    #[error("Not found")]
    RouteNotFound,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("invalid JSON: {0}")]
    MalformedInput(String),

    #[error("{0}")]
    Internal(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl MemoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for MemoryError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            MemoryError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MemoryError::MalformedInput("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(MemoryError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(MemoryError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            MemoryError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            MemoryError::from(io).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_is_stable() {
        assert_eq!(MemoryError::NotFound.to_string(), "Memory not found");
    }
}
