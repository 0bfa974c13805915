//! # Uniform action envelope
//!
//! Every endpoint answers `{ "success": bool, "data"?: T, "error"?: string }`
//! with a status code derived from the error taxonomy. Internal failures are
//! logged in full and surfaced as a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use domains::AppError;

#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present only on rate-limit refusals.
    #[serde(rename = "resetTime", skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<DateTime<Utc>>,
}

impl<T: Serialize> ActionResponse<T> {
    pub fn ok(data: T) -> Json<ActionResponse<T>> {
        Json(ActionResponse { success: true, data: Some(data), error: None, reset_time: None })
    }
}

/// Axum-facing wrapper so the domain error maps onto HTTP at one place.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, reset_time) = match &self.0 {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.0.to_string(), None),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.0.to_string(), None),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string(), None),
            AppError::NotFound(_, _) => (StatusCode::NOT_FOUND, self.0.to_string(), None),
            AppError::RateLimited { reset_at } => {
                (StatusCode::TOO_MANY_REQUESTS, self.0.to_string(), Some(*reset_at))
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string(), None),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong, please try again".to_string(),
                    None,
                )
            }
        };

        let body = ActionResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            reset_time,
        };
        (status, Json(body)).into_response()
    }
}
