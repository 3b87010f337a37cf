use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("restaurant is closed on that day")]
    ClosedDay,

    #[error("same-day reservations close at the cutoff hour")]
    CutOff,

    #[error("selected slot is full")]
    SlotFull,

    #[error("invalid token")]
    TokenInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("reservation not found")]
    NotFound,

    #[error("reservation is {0} and cannot be cancelled")]
    NotCancellable(crate::models::reservation::ReservationStatus),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "validation_failed",
                reason.clone(),
            ),
            AppError::ClosedDay => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "closed_day",
                "the restaurant is closed on the requested day".to_string(),
            ),
            AppError::CutOff => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "cut_off",
                "same-day web reservations have closed; please phone the restaurant".to_string(),
            ),
            AppError::SlotFull => (
                StatusCode::CONFLICT,
                "capacity_error",
                "slot_full",
                "the selected slot is fully booked".to_string(),
            ),
            AppError::TokenInvalid => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_token",
                "invalid or unknown token".to_string(),
            ),
            AppError::TokenExpired => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "token_expired",
                "this link has expired".to_string(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "not_found",
                "reservation not found".to_string(),
            ),
            AppError::NotCancellable(s) => (
                StatusCode::CONFLICT,
                "invalid_request_error",
                "not_cancellable",
                format!("reservation is {} and cannot be cancelled", s.as_str()),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
