use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every failure leaves a handler as `{"error": <message>}` with one of these statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unavailable(String),
    /// `message` goes to the caller, `detail` only to the log.
    #[error("{message}")]
    Internal {
        message: String,
        detail: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, detail: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { message, detail } = &self {
            let chain = format!("{:#}", detail);
            tracing::error!(error = %chain, "{}", message);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
