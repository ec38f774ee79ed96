//! Request error taxonomy and its mapping onto HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use stash_db::StoreError;
use stash_types::api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 400
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    // 401 / 403
    #[error("Authentication token required.")]
    Unauthorized,

    #[error("Invalid or expired token.")]
    Forbidden,

    // 404
    #[error("{0}")]
    NotFound(String),

    // 409
    #[error("{0}")]
    Conflict(String),

    // 500
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn internal() -> Self {
        Self::Internal("Internal server error.".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status_code(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => Self::Conflict("User with this email already exists.".into()),
            StoreError::InvalidOrder => {
                Self::Validation("Invalid list of link IDs for reordering.".into())
            }
            other => {
                error!("Store failure: {}", other);
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// The only path parameter is a link id; one that does not parse matches no link.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        Self::NotFound(LINK_NOT_FOUND.into())
    }
}

pub(crate) const LINK_NOT_FOUND: &str = "Link not found or not authorized.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(StoreError::EmailTaken).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StoreError::InvalidOrder).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn credential_failures_are_bad_requests() {
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.to_string(), "Invalid credentials.");
    }
}
