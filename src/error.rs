//! Handler errors and their HTTP mapping.
//!
//! Every failure is rendered as `{"detail": "..."}`. Store failures other than
//! constraint violations are logged and hidden behind a generic message.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::contracts::ValidationError;
use crate::store::StoreError;

pub const USER_NOT_FOUND: &str = "User not found";
pub const ITEM_NOT_FOUND: &str = "Item not found";
pub const OWNER_NOT_FOUND: &str = "Owner not found";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { constraint } if constraint.contains("email") => {
                Self::Conflict("Email already registered".to_owned())
            }
            StoreError::UniqueViolation { .. } => Self::Conflict("Record already exists".to_owned()),
            StoreError::ForeignKeyViolation { .. } => {
                Self::Conflict("Record is referenced by other records".to_owned())
            }
            error @ StoreError::Database(_) => Self::Store(error),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(ValidationError::Malformed(rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(ValidationError::Malformed(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Store(error) => {
                tracing::error!(%error, "store failure");
                "Internal server error".to_owned()
            }
            other => {
                tracing::debug!(error = %other, %status, "request rejected");
                other.to_string()
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
