use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::repository::RepositoryError;
use crate::services::{BookingError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Booking(err.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Booking(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::IllegalTransition => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::ExhaustedRetries | ErrorKind::System => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            AppError::Booking(BookingError::Unavailable(rejection)) => {
                let mut body = serde_json::json!({
                    "error": rejection.message,
                    "reason": rejection.reason,
                });
                if !rejection.conflicts.is_empty() {
                    body["conflicts"] = serde_json::json!(rejection.conflicts);
                }
                body
            }
            AppError::Booking(BookingError::IllegalTransition { from, to }) => serde_json::json!({
                "error": self.to_string(),
                "from": from,
                "to": to,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, axum::Json(body)).into_response()
    }
}
