use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pitchside_core::{DeliveryAddress, Provider, Subscriber};
use serde::Serialize;

use super::{error_response, to_api_error, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SubscriberResponse {
    pub user_id: String,
    pub providers: Vec<Provider>,
    pub channel_count: usize,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Subscriber> for SubscriberResponse {
    fn from(s: Subscriber) -> Self {
        Self {
            providers: s.channels.iter().map(|c| c.provider()).collect(),
            channel_count: s.channel_count(),
            user_id: s.user_id,
            updated_at: s.updated_at,
        }
    }
}

pub async fn list_subscribers(State(state): State<AppState>) -> ApiResult<Vec<SubscriberResponse>> {
    let subscribers = state.subscribers.list().await.map_err(to_api_error)?;
    Ok(Json(
        subscribers.into_iter().map(SubscriberResponse::from).collect(),
    ))
}

pub async fn get_subscriber(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Subscriber> {
    let subscriber = state
        .subscribers
        .get(&user_id)
        .await
        .map_err(to_api_error)?
        .ok_or_else(|| subscriber_not_found(&user_id))?;
    Ok(Json(subscriber))
}

pub async fn upsert_channel(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(address): Json<DeliveryAddress>,
) -> ApiResult<Subscriber> {
    let updated = state
        .subscribers
        .upsert_channel(&user_id, address)
        .await
        .map_err(to_api_error)?;
    Ok(Json(updated))
}

pub async fn remove_channel(
    State(state): State<AppState>,
    Path((user_id, provider)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let provider: Provider = provider.parse().map_err(to_api_error)?;
    state
        .subscribers
        .remove_channel(&user_id, provider)
        .await
        .map_err(to_api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn subscriber_not_found(user_id: &str) -> (StatusCode, Json<ApiError>) {
    error_response(
        StatusCode::NOT_FOUND,
        "SUBSCRIBER_NOT_FOUND",
        format!("Subscriber not found: {}", user_id),
    )
}
