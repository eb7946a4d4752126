//! HTTP handlers.
//!
//! Errors cross the boundary as a `{ "error": ..., "code": ... }` body
//! with the status derived from the core error.

mod dispatch;
mod health;
mod subscriber;

pub use dispatch::{recent_dispatches, send_notification, RecentQuery};
pub use health::health_check;
pub use subscriber::{get_subscriber, list_subscribers, remove_channel, upsert_channel};

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use pitchside_core::Error;

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.into(),
            code: code.to_string(),
        }),
    )
}

pub fn to_api_error(e: Error) -> (StatusCode, Json<ApiError>) {
    match &e {
        Error::InvalidArgument(msg) => error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_ARGUMENT",
            format!("Invalid argument: {}", msg),
        ),
        Error::InvalidEvent(msg) => error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_EVENT",
            format!("Invalid event: {}", msg),
        ),
        Error::SubscriberNotFound(msg) => error_response(
            StatusCode::NOT_FOUND,
            "SUBSCRIBER_NOT_FOUND",
            format!("Subscriber not found: {}", msg),
        ),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        ),
    }
}
