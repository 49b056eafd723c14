//! Error types for the todo tree service
//!
//! All errors use thiserror for structured error handling.
//! These errors are rendered to HTTP clients as `{ "error": "..." }`.

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Todo not found: {0}")]
    TodoNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Subtask not found: {0}")]
    SubtaskNotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status(&self) -> Status {
        match self {
            AppError::Unauthenticated => Status::Unauthorized,
            AppError::TodoNotFound(_) | AppError::TaskNotFound(_) | AppError::SubtaskNotFound(_) => {
                Status::NotFound
            }
            AppError::InvalidInput(_) => Status::BadRequest,
            AppError::Database(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::StoreUnavailable(_) => Status::InternalServerError,
        }
    }
}

/// JSON error body returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();

        // Store failures are logged in full but never leaked to the client
        let message = if status == Status::InternalServerError {
            tracing::error!("{} {} failed: {}", req.method(), req.uri(), self);
            "Internal server error".to_string()
        } else {
            tracing::debug!("{} {} rejected: {}", req.method(), req.uri(), self);
            self.to_string()
        };

        (status, Json(ErrorBody::new(message))).respond_to(req)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
