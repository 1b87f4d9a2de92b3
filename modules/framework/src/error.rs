use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found")]
    NotFound,

    #[error("permission denied")]
    PermissionsDenied,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("business panic: {0}")]
    BusinessPanic(#[from] anyhow::Error),
}

impl Error {
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PermissionsDenied => StatusCode::FORBIDDEN,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::BusinessPanic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine readable code used as the `error` field of the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::PermissionsDenied => "permission_denied",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Conflict(_) => "conflict",
            Self::Database(_) | Self::BusinessPanic(_) => "internal_error",
        }
    }

    /// Text shown to clients. Internal failures never leak their cause.
    pub fn public_detail(&self) -> String {
        match self {
            Self::Database(_) | Self::BusinessPanic(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    #[serde(flatten)]
    pub extra: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(error: &'static str, detail: impl Into<String>) -> Self {
        Self {
            error,
            detail: detail.into(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        ErrorBody::new(self.code(), self.public_detail()).into_response_with(status)
    }
}
