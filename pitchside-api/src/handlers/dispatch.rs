use axum::{
    extract::{Query, State},
    Json,
};
use pitchside_core::{DispatchRecord, DispatchReport, NotificationEvent};
use serde::Deserialize;

use super::{to_api_error, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn send_notification(
    State(state): State<AppState>,
    Json(event): Json<NotificationEvent>,
) -> ApiResult<DispatchReport> {
    let report = state
        .dispatcher
        .dispatch(event)
        .await
        .map_err(to_api_error)?;
    Ok(Json(report))
}

pub async fn recent_dispatches(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Vec<DispatchRecord>> {
    let limit = query.limit.unwrap_or(20);
    let records = state
        .dispatch_log
        .recent(limit)
        .await
        .map_err(to_api_error)?;
    Ok(Json(records))
}
