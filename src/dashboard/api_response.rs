// Response envelope and error mapping for the dashboard API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::core::identity::IdentityError;
use crate::core::marketplace::MoneyParseError;
use crate::core::moderation::ModerationError;

/// Every endpoint answers with this shape.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Finish registering your profile first")]
    ProfileRequired,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Moderation(#[from] ModerationError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl ApiError {
    /// Price and amount fields arrive as text, e.g. "12,50".
    pub fn invalid_money(field: &str, error: MoneyParseError) -> Self {
        ApiError::BadRequest(format!("{}: {}", field, error))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::ProfileRequired => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Identity(IdentityError::InvalidToken(reason)) => {
                tracing::debug!(reason = %reason, "Rejected session token");
                (StatusCode::UNAUTHORIZED, "Invalid or expired session".into())
            }
            ApiError::Identity(IdentityError::Store(err)) => {
                tracing::error!(error = %err, "Store failure while resolving session");
                unavailable()
            }
            ApiError::Moderation(err) if !err.is_user_facing() => {
                tracing::error!(error = %err, "Store failure while handling request");
                unavailable()
            }
            ApiError::Moderation(err) => {
                let status = match err {
                    ModerationError::Validation(_) => StatusCode::BAD_REQUEST,
                    ModerationError::Authorization(_) | ModerationError::NotApproved(_) => {
                        StatusCode::FORBIDDEN
                    }
                    ModerationError::NotFound { .. } => StatusCode::NOT_FOUND,
                    ModerationError::InvalidState { .. } => StatusCode::CONFLICT,
                    ModerationError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, err.to_string())
            }
        }
    }
}

fn unavailable() -> (StatusCode, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "Temporarily unavailable, please try again".into(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}
