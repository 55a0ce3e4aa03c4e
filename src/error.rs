use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid state transition: {0}")]
    InvalidState(String),
    #[error("Protected state: {0}")]
    ProtectedState(String),
    #[error("Could not issue a unique QR code after {0} attempts")]
    IssuanceExhausted(u32),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

// 5/6/517 = SQLite busy/locked/busy-snapshot, 40001/40P01 = PostgreSQL serialization failure/deadlock
const TRANSIENT_DB_CODES: &[&str] = &["5", "6", "517", "40001", "40P01"];

impl AppError {
    /// Store failures worth one more attempt of an idempotent read-then-CAS sequence.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Database(e) => match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db_err) => db_err
                    .code()
                    .is_some_and(|code| TRANSIENT_DB_CODES.contains(&code.as_ref())),
                _ => false,
            },
            _ => false,
        }
    }

    /// True when a unique constraint involving `column` rejected the write.
    pub fn is_unique_violation(&self, column: &str) -> bool {
        match self {
            AppError::Database(e) => e.as_database_error().is_some_and(|db_err| {
                db_err.is_unique_violation()
                    && (db_err.message().contains(column)
                        || db_err.constraint().is_some_and(|c| c.contains(column)))
            }),
            _ => false,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) if self.is_transient() => "unavailable",
            AppError::Database(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidState(_) => "invalid_state",
            AppError::ProtectedState(_) => "protected_state",
            AppError::IssuanceExhausted(_) => "issuance_exhausted",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Internal | AppError::InternalWithMsg(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Database(e) => {
                if e.as_database_error().is_some_and(|db_err| db_err.is_unique_violation()) {
                    return (
                        StatusCode::CONFLICT,
                        Json(json!({ "error": "Resource already exists (duplicate entry)", "code": "conflict" })),
                    )
                        .into_response();
                }

                error!("Database error: {:?}", e);
                if self.is_transient() {
                    (StatusCode::SERVICE_UNAVAILABLE, "Store temporarily unavailable".to_string())
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ProtectedState(msg) => (StatusCode::LOCKED, msg.clone()),
            AppError::IssuanceExhausted(attempts) => {
                error!("QR issuance exhausted after {} attempts", attempts);
                (StatusCode::INTERNAL_SERVER_ERROR, "Could not issue a QR code".to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
