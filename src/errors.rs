//! Application error taxonomy and its HTTP mapping.
//!
//! Every handler returns `AppResult<T>`; errors are converted to a JSON body
//! of the form `{"error": "<message>"}` at the response boundary. Nothing
//! propagates past `IntoResponse` as an unhandled fault.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed, missing or out-of-range input — 400.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired token — 401.
    #[error("Authentication required")]
    Unauthorized,

    /// Role mismatch — 403.
    #[error("Insufficient privileges")]
    Forbidden,

    /// Entity absent, or present but outside the caller's scope — 404.
    /// The two cases are deliberately indistinguishable so that scoped
    /// lookups don't leak the existence of other users' records.
    #[error("Not found")]
    NotFound,

    /// Duplicate unique field or duplicate Assignment Graph edge.
    /// Surfaced as 400 rather than a distinct 409.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected store or I/O failure — 500. The message is logged, the
    /// client only sees a generic error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized  => StatusCode::UNAUTHORIZED,
            AppError::Forbidden     => StatusCode::FORBIDDEN,
            AppError::NotFound      => StatusCode::NOT_FOUND,
            AppError::Conflict(_)   => StatusCode::BAD_REQUEST,
            AppError::Internal(_)   => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "Internal server error");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_response_contract() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Internal(anyhow::anyhow!("boom")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflicts_surface_as_bad_request() {
        // Duplicate edges and duplicate unique fields share the 400 class.
        let err = AppError::Conflict("Student already assigned to this school".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Student already assigned to this school");
    }

    #[test]
    fn not_found_message_does_not_leak_scope() {
        assert_eq!(AppError::NotFound.to_string(), "Not found");
    }
}
