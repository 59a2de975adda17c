use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("one or more appointments could not be created")]
    SlotConflicts(Vec<String>),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid username or password")]
    BadCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::SlotConflicts(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                serde_json::json!({ "error": "internal error" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                serde_json::json!({ "error": "internal error" })
            }
            AppError::SlotConflicts(conflicts) => {
                serde_json::json!({ "error": self.to_string(), "conflicts": conflicts })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        if matches!(self, AppError::Unauthorized) {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                axum::Json(body),
            )
                .into_response();
        }

        (status, axum::Json(body)).into_response()
    }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        AppError::Internal("database lock poisoned".to_string())
    }
}
